use std::fmt::Display;

use crate::{cpu::OpCode, error::ExecError};

/// One line of the recipe as the caller hands it over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub address: String,
    pub text: String,
}

impl Row {
    pub fn new(address: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            text: text.into(),
        }
    }
}

/// Destination of a JUMP or JZ: a row position, or the address label of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Index(usize),
    Label(String),
}

impl Target {
    fn parse(token: &str) -> Self {
        match token.parse::<usize>() {
            Ok(index) => Self::Index(index),
            Err(_) => Self::Label(token.to_string()),
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{}", index),
            Self::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Load(String),
    Store(String),
    Add(String),
    Sub(String),
    Mul(String),
    Div(String),
    Set(f64),
    Out,
    Halt,
    Jump(Target),
    Jz(Target),
}

impl Instruction {
    /// Decodes the text of a single row. Blank text yields `Ok(None)`.
    pub fn decode(text: &str) -> Result<Option<Self>, ExecError> {
        let mut tokens = text.split_whitespace();
        let Some(mnemonic) = tokens.next() else {
            return Ok(None);
        };
        let opcode = OpCode::try_from(mnemonic)?;
        let operand = tokens.next();
        if let Some(extra) = tokens.next() {
            return Err(ExecError::UnexpectedOperand(opcode, extra.to_string()));
        }

        let required = || operand.ok_or(ExecError::MissingOperand(opcode));
        let address = || required().map(str::to_string);
        let bare = |instruction: Self| match operand {
            Some(op) => Err(ExecError::UnexpectedOperand(opcode, op.to_string())),
            None => Ok(instruction),
        };

        let instruction = match opcode {
            OpCode::Load => Self::Load(address()?),
            OpCode::Store => Self::Store(address()?),
            OpCode::Add => Self::Add(address()?),
            OpCode::Sub => Self::Sub(address()?),
            OpCode::Mul => Self::Mul(address()?),
            OpCode::Div => Self::Div(address()?),
            OpCode::Set => Self::Set(parse_literal(required()?)?),
            OpCode::Out => bare(Self::Out)?,
            OpCode::Halt => bare(Self::Halt)?,
            OpCode::Jump => Self::Jump(Target::parse(required()?)),
            OpCode::Jz => Self::Jz(Target::parse(required()?)),
        };
        Ok(Some(instruction))
    }

    pub fn opcode(&self) -> OpCode {
        match self {
            Self::Load(_) => OpCode::Load,
            Self::Store(_) => OpCode::Store,
            Self::Add(_) => OpCode::Add,
            Self::Sub(_) => OpCode::Sub,
            Self::Mul(_) => OpCode::Mul,
            Self::Div(_) => OpCode::Div,
            Self::Set(_) => OpCode::Set,
            Self::Out => OpCode::Out,
            Self::Halt => OpCode::Halt,
            Self::Jump(_) => OpCode::Jump,
            Self::Jz(_) => OpCode::Jz,
        }
    }
}

fn parse_literal(token: &str) -> Result<f64, ExecError> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ExecError::InvalidLiteral(token.to_string())),
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let opcode = self.opcode();
        match self {
            Self::Load(a) | Self::Store(a) | Self::Add(a) | Self::Sub(a) | Self::Mul(a)
            | Self::Div(a) => write!(f, "{} {}", opcode, a),
            Self::Set(v) => write!(f, "{} {}", opcode, v),
            Self::Jump(t) | Self::Jz(t) => write!(f, "{} {}", opcode, t),
            Self::Out | Self::Halt => write!(f, "{}", opcode),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    rows: Vec<Row>,
}

impl Program {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// One row per source line, addressed by its zero-based line index.
    pub fn parse(source: &str) -> Self {
        source
            .lines()
            .enumerate()
            .map(|(index, line)| Row::new(index.to_string(), line.trim()))
            .collect()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn resolve(&self, target: &Target) -> Result<usize, ExecError> {
        match target {
            Target::Index(index) => Ok(*index),
            Target::Label(label) => self
                .rows
                .iter()
                .position(|row| row.address == *label)
                .ok_or_else(|| ExecError::UnknownJumpTarget(label.clone())),
        }
    }
}

impl FromIterator<Row> for Program {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
