pub mod command_reader;
pub mod report_writer;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}
