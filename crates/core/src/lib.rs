#![deny(warnings)]

pub mod cascade;
pub mod config;
pub mod lexicon;
pub mod proxy;
pub mod translate;
