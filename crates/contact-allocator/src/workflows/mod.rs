pub mod allocation;
pub mod sheets;
pub mod workbook;
