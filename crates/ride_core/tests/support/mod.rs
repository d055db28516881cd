#![allow(dead_code)]

pub mod doubles;
