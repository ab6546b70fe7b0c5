use std::fmt::Display;

use crate::error::ExecError;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cpu {
    pub acc: f64,   // The accumulator register
    pub pc: usize,  // The program counter register
    pub halt: bool, // Flag keeping the current running state
}

impl Display for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cpu [ acc: {}, pc: {}, halt: {} ]", self.acc, self.pc, self.halt)
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Load,  // A  = M[x]
    Store, // M[x] = A
    Add,   // A += M[x]
    Sub,   // A -= M[x]
    Mul,   // A *= M[x]
    Div,   // A /= M[x], fails on zero
    Set,   // A  = literal
    Out,   // emit A
    Halt,  // halt = true
    Jump,  // PC = target
    Jz,    // if A == 0 then PC = target else PC += 1
}

impl OpCode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Load => "LOAD",
            Self::Store => "STORE",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Set => "SET",
            Self::Out => "OUT",
            Self::Halt => "HALT",
            Self::Jump => "JUMP",
            Self::Jz => "JZ",
        }
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl TryFrom<&str> for OpCode {
    type Error = ExecError;

    fn try_from(v: &str) -> Result<Self, Self::Error> {
        match v.to_ascii_uppercase().as_str() {
            "LOAD" => Ok(Self::Load),
            "STORE" => Ok(Self::Store),
            "ADD" => Ok(Self::Add),
            "SUB" => Ok(Self::Sub),
            "MUL" => Ok(Self::Mul),
            "DIV" => Ok(Self::Div),
            "SET" => Ok(Self::Set),
            "OUT" => Ok(Self::Out),
            "HALT" => Ok(Self::Halt),
            "JUMP" => Ok(Self::Jump),
            "JZ" => Ok(Self::Jz),
            _ => Err(ExecError::UnknownOpcode(v.to_string())),
        }
    }
}
