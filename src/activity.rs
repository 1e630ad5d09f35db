//! Activity change records.

use std::fmt;


//------------ Activity ------------------------------------------------------

/// The activity a driver was engaged in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Activity {
    Break,
    Available,
    Work,
    Driving,
}

impl Activity {
    /// Returns the activity for the two activity bits.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Activity::Break,
            1 => Activity::Available,
            2 => Activity::Work,
            _ => Activity::Driving,
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Activity::Break => "Break",
            Activity::Available => "Available",
            Activity::Work => "Work",
            Activity::Driving => "Driving",
        })
    }
}


//------------ ActivityChange ------------------------------------------------

/// A change of activity, packed into two octets.
///
/// The octets are laid out as `scpaattt tttttttt` where `s` is the slot,
/// `c` the crew status, `p` whether the card is *not* inserted, `aa` the
/// activity, and the eleven `t` bits the minutes since midnight.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActivityChange {
    pub slot: u8,
    pub status: u8,
    pub inserted: bool,
    pub activity: Activity,
    pub minutes: u16,
}

impl ActivityChange {
    pub fn from_octets(octets: [u8; 2]) -> Self {
        let [first, second] = octets;
        ActivityChange {
            slot: (first >> 7) & 0x01,
            status: (first >> 6) & 0x01,
            inserted: (first >> 5) & 0x01 == 0,
            activity: Activity::from_bits(first >> 3),
            minutes: u16::from(first & 0x07) << 8 | u16::from(second),
        }
    }

    /// Returns the time of day as `HH:MM`.
    pub fn time(&self) -> String {
        format!("{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

impl fmt::Display for ActivityChange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f, "slot={}, status={}, inserted={}, activity={}, time={}",
            self.slot, self.status, self.inserted, self.activity, self.time()
        )
    }
}


//============ Tests =========================================================
