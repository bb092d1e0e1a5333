pub(crate) mod budget;
pub(crate) mod calculator;
pub(crate) mod entries;
pub(crate) mod expenses;
pub(crate) mod recurring;
pub(crate) mod thumbnails;
