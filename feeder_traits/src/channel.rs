use core::fmt;

/// One of the two independent weight lines on the remote unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    One,
    Two,
}

impl Channel {
    /// Both channels in id order.
    pub const ALL: [Channel; 2] = [Channel::One, Channel::Two];

    /// Wire id as used by the remote unit and the store (1 or 2).
    #[inline]
    pub fn id(self) -> u8 {
        match self {
            Channel::One => 1,
            Channel::Two => 2,
        }
    }

    /// Zero-based slot for fixed-size per-channel arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Channel::One => 0,
            Channel::Two => 1,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Channel::One),
            2 => Some(Channel::Two),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Channel {
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::from_id(id).ok_or(id)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scale{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_and_reject_unknown() {
        for ch in Channel::ALL {
            assert_eq!(Channel::try_from(ch.id()), Ok(ch));
        }
        assert_eq!(Channel::try_from(0), Err(0));
        assert_eq!(Channel::try_from(3), Err(3));
    }

    #[test]
    fn index_matches_all_order() {
        for (i, ch) in Channel::ALL.iter().enumerate() {
            assert_eq!(ch.index(), i);
        }
        assert_eq!(Channel::Two.to_string(), "scale2");
    }
}
