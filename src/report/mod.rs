pub mod table;

pub use table::{ReportRow, ResultTable, CSV_HEADER};
