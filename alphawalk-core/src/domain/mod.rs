//! Domain types shared by the simulator and the optimizer.

pub mod bar;
pub mod calendar;
pub mod position;
pub mod series;

pub use bar::Bar;
pub use calendar::ExpirationCalendar;
pub use position::{Position, PositionSeries};
pub use series::BarSeries;
