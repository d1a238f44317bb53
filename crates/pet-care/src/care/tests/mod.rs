mod common;
mod requests;
