#![cfg(test)]

mod harness;

mod console;
mod drives;
mod mmu;
mod remote;
