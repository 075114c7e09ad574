pub mod devmap;
pub mod disassemble;
pub mod run;
