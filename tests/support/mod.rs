#![allow(dead_code)]

pub mod boards;
pub mod voltorb_env;
