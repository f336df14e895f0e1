//! Context block assembly.
//!
//! Each ticket renders as `Title: <title>\nDescription: <description>`; units
//! are joined by a fixed separator. When the block exceeds its character
//! budget, whole tickets are dropped lowest score first.

use cuttlefish_types::{PointId, Ticket};

/// Separator placed between ticket units.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Default character budget.
pub const DEFAULT_MAX_CHARS: usize = 12_000;

/// Bounded textual restatement of retrieved tickets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBlock {
    /// Prompt-ready text
    pub text: String,

    /// Tickets included, in retrieval order
    pub included: Vec<PointId>,

    /// Tickets dropped to respect the budget
    pub dropped: usize,
}

impl ContextBlock {
    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }
}

/// Builds context blocks under a character budget.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    max_chars: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS)
    }
}

impl ContextAssembler {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Render a single ticket unit.
    pub fn render(ticket: &Ticket) -> String {
        format!("Title: {}\nDescription: {}", ticket.title, ticket.description)
    }

    /// Assemble tickets into a block, preserving their order.
    pub fn assemble(&self, tickets: &[Ticket]) -> ContextBlock {
        let units: Vec<String> = tickets.iter().map(Self::render).collect();
        let sep_len = CONTEXT_SEPARATOR.chars().count();
        let mut kept: Vec<usize> = (0..tickets.len()).collect();
        let mut total: usize = units.iter().map(|u| u.chars().count()).sum::<usize>()
            + sep_len * kept.len().saturating_sub(1);

        while total > self.max_chars {
            // Lowest score goes first; among equals, the one ranked later.
            let Some((pos, &victim)) = kept.iter().enumerate().min_by(|(_, &a), (_, &b)| {
                tickets[a]
                    .score
                    .total_cmp(&tickets[b].score)
                    .then_with(|| tickets[b].id.cmp(&tickets[a].id))
            }) else {
                break;
            };
            total -= units[victim].chars().count();
            if kept.len() > 1 {
                total -= sep_len;
            }
            kept.remove(pos);
        }

        let text = kept
            .iter()
            .map(|&i| units[i].as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        ContextBlock {
            text,
            included: kept.iter().map(|&i| tickets[i].id.clone()).collect(),
            dropped: tickets.len() - kept.len(),
        }
    }
}
