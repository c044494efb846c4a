//! S98 dump command definitions

use serde::Serialize;

/// A parsed S98 dump command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum S98Command {
    /// Register write; port 1 is the extended bank
    Write { device: u8, port: u8, reg: u8, data: u8 },
    /// Wait one sync unit
    Sync,
    /// Wait `count` sync units
    SyncN { count: u64 },
    /// End of dump data
    End,
}

impl S98Command {
    /// Number of sync units this command waits
    pub fn sync_count(&self) -> u64 {
        match self {
            S98Command::Sync => 1,
            S98Command::SyncN { count } => *count,
            _ => 0,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, S98Command::Write { .. })
    }

    /// Full register address including the bank bit
    pub fn address(&self) -> Option<u16> {
        match self {
            S98Command::Write { port, reg, .. } => Some(((*port as u16) << 8) | *reg as u16),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_includes_bank() {
        let write = S98Command::Write {
            device: 0,
            port: 1,
            reg: 0xA4,
            data: 0x22,
        };
        assert!(write.is_write());
        assert_eq!(write.address(), Some(0x1A4));
        assert_eq!(write.sync_count(), 0);
        assert_eq!(S98Command::SyncN { count: 9 }.sync_count(), 9);
        assert_eq!(S98Command::End.address(), None);
    }
}
