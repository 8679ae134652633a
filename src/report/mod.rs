pub mod calendar;
pub mod donut;
pub mod exec;
pub mod network;
pub mod output;
pub mod running;

pub use calendar::{CalendarDay, CalendarSeries};
pub use donut::{Donut, DonutShare};
pub use exec::{exec, generate_reports};
pub use network::{Network, NetworkEdge, NetworkNode};
pub use output::{write_render_input, Outcome, RenderInput, ReportKind};
pub use running::{Running, RunningPoint, RunningSeries};
