mod basic;
mod cancel;
mod helper;
mod redirect;
