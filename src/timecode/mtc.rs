use super::{Framerate, Timecode};

impl Framerate {
    /// Maps an MTC rate index (0..=3) to a framerate; `pull_down` selects the
    /// video-speed variant of the same base rate.
    pub fn from_mtc_index(index: u8, pull_down: bool) -> Option<Framerate> {
        match index {
            0 => Some(Framerate::new(24, pull_down, false)),
            1 => Some(Framerate::new(25, pull_down, false)),
            2 => Some(Framerate::new(30, pull_down, true)),
            3 => Some(Framerate::new(30, pull_down, false)),
            _ => None,
        }
    }

    pub fn mtc_index(&self) -> u8 {
        match (self.fps(), self.is_drop_frame()) {
            (24, _) => 0,
            (25, _) => 1,
            (30, true) => 2,
            _ => 3,
        }
    }
}

impl Timecode {
    /// Builds a timecode from the eight quarter-frame nibbles, indexed by piece.
    /// Returns `None` when piece 7 carries no valid rate index.
    pub fn from_mtc_pieces(pieces: &[u8; 8], pull_down: bool) -> Option<Timecode> {
        let rate_index = (pieces[7] >> 1) & 0x03;
        let framerate = Framerate::from_mtc_index(rate_index, pull_down)?;
        let ff = (pieces[0] & 0x0F) | ((pieces[1] & 0x01) << 4);
        let ss = (pieces[2] & 0x0F) | ((pieces[3] & 0x03) << 4);
        let mm = (pieces[4] & 0x0F) | ((pieces[5] & 0x03) << 4);
        let hh = (pieces[6] & 0x0F) | ((pieces[7] & 0x01) << 4);
        Some(Timecode::new(framerate, hh.into(), mm.into(), ss.into(), ff.into()))
    }

    /// Splits this timecode into the eight quarter-frame nibbles.
    pub fn to_mtc_pieces(&self) -> [u8; 8] {
        let (hh, mm, ss, ff) = (self.hh as u8, self.mm as u8, self.ss as u8, self.ff as u8);
        [
            ff & 0x0F,
            (ff >> 4) & 0x01,
            ss & 0x0F,
            (ss >> 4) & 0x03,
            mm & 0x0F,
            (mm >> 4) & 0x03,
            hh & 0x0F,
            ((hh >> 4) & 0x01) | (self.framerate.mtc_index() << 1),
        ]
    }

    /// Decodes the body of an MTC full-frame sysex (`7F dev 01 01 hr mn sc fr`,
    /// without the F0/F7 delimiters).
    pub fn from_mtc_full_frame(data: &[u8], pull_down: bool) -> Option<Timecode> {
        match data {
            [0x7F, _device, 0x01, 0x01, hr, mn, sc, fr] => {
                let framerate = Framerate::from_mtc_index((hr >> 5) & 0x03, pull_down)?;
                Some(Timecode::new(
                    framerate,
                    (hr & 0x1F).into(),
                    (mn & 0x3F).into(),
                    (sc & 0x3F).into(),
                    (fr & 0x1F).into(),
                ))
            }
            _ => None,
        }
    }
}
