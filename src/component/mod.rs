//! Reusable UI components. None of them know about Docker.

pub mod overlay;
pub mod pager;
pub mod table;

pub use overlay::{MenuItem, Outcome, Overlay, OverlayKind, OverlayResult, Target};
pub use pager::{Pager, PagerEvent, PagerLine, PagerMode, StreamState};
pub use table::{Column, SortKey, Table, TableLine, TableRow, TableView};
