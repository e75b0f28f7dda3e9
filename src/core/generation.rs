use std::sync::atomic::{AtomicU64, Ordering};

/// 單調遞增的請求世代。發出請求時取一張 ticket，回應抵達時
/// 只有 ticket 仍是最新的才會套用，較舊的回應直接丟棄。
#[derive(Debug, Default)]
pub struct Generation {
    latest: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_ticket_wins() {
        let generation = Generation::new();
        let first = generation.issue();
        assert!(generation.is_current(first));

        let second = generation.issue();
        assert!(second > first);
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
    }
}
