pub mod budget;
pub mod compress;
pub mod detect;
pub mod init;
pub mod parse;
