use crate::cpu::OpCode;

/// Faults that stop a run. The `Display` text is what ends up in the trace.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ExecError {
    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),
    #[error("{0} needs an operand")]
    MissingOperand(OpCode),
    #[error("{0} does not take operand `{1}`")]
    UnexpectedOperand(OpCode, String),
    #[error("invalid literal `{0}`")]
    InvalidLiteral(String),
    #[error("jump target `{0}` does not name an instruction")]
    UnknownJumpTarget(String),
    #[error("division by zero ({0} is 0)")]
    DivisionByZero(String),
    #[error("stopped after {0} steps: possible infinite loop")]
    StepBudgetExceeded(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("cannot create decode cache: {0}")]
    DecodeCache(String),
}
