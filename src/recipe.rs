//! The recipe selector: one kitchen, two ingredients, four ways to combine
//! them. Swapping the recipe changes the dish without touching the machine.

use std::{collections::BTreeMap, fmt::Display};

use crate::program::Program;

/// Memory cell holding the first ingredient in recipe programs.
pub const INGREDIENT_A: &str = "A";
/// Memory cell holding the second ingredient in recipe programs.
pub const INGREDIENT_B: &str = "B";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipe {
    Add,
    Multiply,
    Average,
    Max,
}

impl Recipe {
    pub const ALL: [Recipe; 4] = [Self::Add, Self::Multiply, Self::Average, Self::Max];

    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Multiply => a * b,
            Self::Average => (a + b) / 2.0,
            Self::Max => a.max(b),
        }
    }

    /// The recipe written as a program for the interpreter, reading the
    /// ingredients from [`INGREDIENT_A`] and [`INGREDIENT_B`]. `Max` has none:
    /// JZ can only test for zero, not compare.
    pub fn program(self) -> Option<Program> {
        let source = match self {
            Self::Add => "LOAD A\nADD B\nOUT\nHALT",
            Self::Multiply => "LOAD A\nMUL B\nOUT\nHALT",
            Self::Average => "SET 2\nSTORE TWO\nLOAD A\nADD B\nDIV TWO\nOUT\nHALT",
            Self::Max => return None,
        };
        Some(Program::parse(source))
    }

    pub fn ingredients(a: f64, b: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([(INGREDIENT_A.to_string(), a), (INGREDIENT_B.to_string(), b)])
    }
}

impl Display for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Multiply => "multiply",
            Self::Average => "average",
            Self::Max => "max",
        };
        f.write_str(name)
    }
}
