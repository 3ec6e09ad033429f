use crate::error::{PushwireError, Result};

/// Command byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Server→client only.
    Error = 0,
    Echo = 1,
    Bind = 2,
    Push = 3,
    Broadcast = 4,
    Ip = 5,
}

impl Command {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(Command::Error),
            1 => Some(Command::Echo),
            2 => Some(Command::Bind),
            3 => Some(Command::Push),
            4 => Some(Command::Broadcast),
            5 => Some(Command::Ip),
            _ => None,
        }
    }

    /// Validate a command byte received from a client.
    ///
    /// ERROR is never a valid request, so it is rejected like any other
    /// unknown byte.
    pub fn parse_request(b: u8) -> Result<Self> {
        match Self::from_u8(b) {
            Some(Command::Error) | None => Err(PushwireError::UnknownCommand(b)),
            Some(cmd) => Ok(cmd),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Lowercase name used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Error => "error",
            Command::Echo => "echo",
            Command::Bind => "bind",
            Command::Push => "push",
            Command::Broadcast => "broadcast",
            Command::Ip => "ip",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_bytes() {
        assert_eq!(Command::parse_request(1).ok(), Some(Command::Echo));
        assert_eq!(Command::parse_request(5).ok(), Some(Command::Ip));
        assert!(matches!(
            Command::parse_request(0),
            Err(PushwireError::UnknownCommand(0))
        ));
        assert!(matches!(
            Command::parse_request(99),
            Err(PushwireError::UnknownCommand(99))
        ));
    }
}
