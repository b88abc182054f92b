//! Bounded reagent mixtures.
//!
//! A [`Solution`] holds fixed-point quantities of reagents up to a maximum
//! volume. Splitting removes a proportional slice of every reagent and never
//! removes more than is present.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, mul_div};
use crate::id::ReagentId;

/// A mixture of reagents with a volume cap.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Solution {
    reagents: BTreeMap<ReagentId, Fixed64>,
    max_volume: Fixed64,
}

impl Solution {
    /// An empty solution that can hold up to `max_volume`.
    pub fn new(max_volume: Fixed64) -> Self {
        Self {
            reagents: BTreeMap::new(),
            max_volume: max_volume.max(Fixed64::ZERO),
        }
    }

    /// Builder form of [`add_reagent`](Self::add_reagent).
    pub fn with_reagent(mut self, reagent: ReagentId, quantity: Fixed64) -> Self {
        self.add_reagent(reagent, quantity);
        self
    }

    /// Total volume of all reagents.
    pub fn volume(&self) -> Fixed64 {
        self.reagents
            .values()
            .fold(Fixed64::ZERO, |acc, q| acc.saturating_add(*q))
    }

    pub fn max_volume(&self) -> Fixed64 {
        self.max_volume
    }

    /// Remaining headroom. Never negative.
    pub fn available_volume(&self) -> Fixed64 {
        (self.max_volume - self.volume()).max(Fixed64::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.volume() <= Fixed64::ZERO
    }

    /// Quantity of a single reagent (zero when absent).
    pub fn quantity(&self, reagent: ReagentId) -> Fixed64 {
        self.reagents.get(&reagent).copied().unwrap_or(Fixed64::ZERO)
    }

    /// Iterate reagents in id order.
    pub fn reagents(&self) -> impl Iterator<Item = (ReagentId, Fixed64)> + '_ {
        self.reagents.iter().map(|(r, q)| (*r, *q))
    }

    /// Add a reagent quantity without checking the cap. Non-positive
    /// quantities are ignored. Callers that must respect the cap check
    /// [`can_add_solution`](Self::can_add_solution) first.
    pub fn add_reagent(&mut self, reagent: ReagentId, quantity: Fixed64) {
        if quantity <= Fixed64::ZERO {
            return;
        }
        let entry = self.reagents.entry(reagent).or_insert(Fixed64::ZERO);
        *entry = entry.saturating_add(quantity);
    }

    /// Whether `other` fits into the remaining headroom.
    pub fn can_add_solution(&self, other: &Solution) -> bool {
        other.volume() <= self.available_volume()
    }

    /// Merge `other` into this solution. The cap is not checked here.
    pub fn add_solution(&mut self, other: Solution) {
        for (reagent, quantity) in other.reagents {
            self.add_reagent(reagent, quantity);
        }
    }

    /// Remove up to `amount` from this solution, proportionally across
    /// reagents. The returned solution's volume is exactly
    /// `min(amount, self.volume())` and its cap equals that volume.
    pub fn split(&mut self, amount: Fixed64) -> Solution {
        let volume = self.volume();
        let amount = amount.min(volume);
        if amount <= Fixed64::ZERO {
            return Solution::new(Fixed64::ZERO);
        }
        if amount == volume {
            let reagents = std::mem::take(&mut self.reagents);
            return Solution {
                reagents,
                max_volume: amount,
            };
        }

        // Truncated proportional shares, then hand out the rounding
        // remainder to reagents that still have quantity left.
        let mut shares: Vec<(ReagentId, Fixed64, Fixed64)> = self
            .reagents
            .iter()
            .map(|(r, q)| (*r, *q, mul_div(*q, amount, volume).min(*q)))
            .collect();
        let taken = shares
            .iter()
            .fold(Fixed64::ZERO, |acc, (_, _, s)| acc + *s);
        let mut remainder = amount - taken;
        for (_, held, share) in shares.iter_mut() {
            if remainder <= Fixed64::ZERO {
                break;
            }
            let extra = (*held - *share).min(remainder);
            *share += extra;
            remainder -= extra;
        }
        let mut surplus = -remainder;
        for (_, _, share) in shares.iter_mut().rev() {
            if surplus <= Fixed64::ZERO {
                break;
            }
            let cut = (*share).min(surplus);
            *share -= cut;
            surplus -= cut;
        }

        let mut removed = Solution::new(amount);
        for (reagent, held, share) in shares {
            if share <= Fixed64::ZERO {
                continue;
            }
            let left = held - share;
            if left <= Fixed64::ZERO {
                self.reagents.remove(&reagent);
            } else {
                self.reagents.insert(reagent, left);
            }
            removed.reagents.insert(reagent, share);
        }
        removed
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reagents.is_empty() {
            return write!(f, "[empty]");
        }
        write!(f, "[")?;
        for (i, (reagent, quantity)) in self.reagents.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{reagent}: {quantity}u")?;
        }
        write!(f, "]")
    }
}
