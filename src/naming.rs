use chrono::{Local, NaiveDate};

/// `DD-MM-YYYY.zip` for the given date.
pub fn archive_file_name(date: NaiveDate) -> String {
    format!("{}.zip", date.format("%d-%m-%Y"))
}

pub fn today_archive_file_name() -> String {
    archive_file_name(Local::now().date_naive())
}
