use std::fmt;

use crate::cache::Table;
use crate::model::entity::Seat;
use crate::model::group::{Arrangement, Layout};
use crate::round::RoundTable;

/// Writes one table of a report.
pub trait Render {
    fn render(&self, number: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

fn name(seat: &Seat) -> &str {
    seat.as_ref().map_or("", |guest| &guest.name)
}

impl Render for Table {
    fn render(&self, number: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Table {} -- subtotal {:.0}; table {:.0}\n", number, self.score(), self.table_score())?;
        let rows = self.left().iter().zip(self.left_scores()).zip(self.right().iter().zip(self.right_scores()));
        for ((left, left_score), (right, right_score)) in rows {
            writeln!(f, "{:5.0} {:<30}  {:5.0} {:<30}", left_score, name(left), right_score, name(right))?;
        }
        writeln!(f, "\n")
    }
}

impl Render for RoundTable {
    fn render(&self, number: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Table {} -- subtotal {:.0}\n", number, self.score())?;
        for (seat, score) in self.seats().iter().zip(self.scores()) {
            writeln!(f, "{:5.0} {}", score, name(seat))?;
        }
        writeln!(f, "\n")
    }
}

/// Console rendering of a whole arrangement: every table, then the total.
pub struct Report<'a, T>(pub &'a Arrangement<T>);

impl<T: Layout + Render> fmt::Display for Report<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}\n", "-".repeat(40))?;
        for (i, table) in self.0.tables.iter().enumerate() {
            table.render(i + 1, f)?;
        }
        writeln!(f, "Score {:.0}\n", self.0.score())
    }
}
