use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("sale amounts of ticket {ticket} exceed the decimal range")]
    TicketTotalOverflow { ticket: i64 },
    #[error(
        "sales of {} on {date} exceed the decimal range",
        country.as_deref().unwrap_or("an unknown country")
    )]
    CountryDayOverflow {
        date: NaiveDate,
        country: Option<String>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
