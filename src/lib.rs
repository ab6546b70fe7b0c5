pub mod bottleneck;
pub mod cpu;
pub mod error;
pub mod memory;
pub mod program;
pub mod recipe;

use std::collections::BTreeMap;

use caches::Cache;
use cpu::Cpu;
use error::{EngineError, ExecError};
use log::{debug, info, warn};
use memory::{Addressable, Memory};
use program::{Instruction, Program, Row};

/// Steps a single run may execute before it is treated as a runaway loop.
pub const MAX_STEPS: usize = 100;
pub const DECODE_CACHE_SIZE: usize = 32;

type Decoded = Result<Option<Instruction>, ExecError>;
type DecodeCache = caches::AdaptiveCache<String, Decoded>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub max_steps: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: MAX_STEPS,
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    Halted,
    EndOfProgram,
    Fault(ExecError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub output: Vec<f64>,
    pub trace: Vec<String>,
    pub accumulator: f64,
    pub memory: BTreeMap<String, f64>,
    pub stop: StopReason,
}

impl From<RunResult> for (Vec<f64>, Vec<String>, f64, BTreeMap<String, f64>) {
    fn from(result: RunResult) -> Self {
        (result.output, result.trace, result.accumulator, result.memory)
    }
}

/// State of one run. Created fresh for every invocation and consumed into a
/// [`RunResult`] at the end.
struct Machine {
    cpu: Cpu,
    memory: Memory,
    output: Vec<f64>,
    trace: Vec<String>,
}

impl Machine {
    fn new(memory: Memory) -> Self {
        Self {
            cpu: Cpu::new(),
            memory,
            output: Vec::new(),
            trace: Vec::new(),
        }
    }

    fn debug_state(&self) {
        debug!(
            "State: PC: {}, ACC: {}, OUT: {:?}",
            self.cpu.pc, self.cpu.acc, self.output
        );
    }

    fn execute(&mut self, program: &Program, instruction: &Instruction) -> Result<(), ExecError> {
        match instruction {
            Instruction::Load(a) => self.cpu.acc = self.memory.read(a),
            Instruction::Store(a) => self.memory.write(a, self.cpu.acc),
            Instruction::Add(a) => self.cpu.acc += self.memory.read(a),
            Instruction::Sub(a) => self.cpu.acc -= self.memory.read(a),
            Instruction::Mul(a) => self.cpu.acc *= self.memory.read(a),
            Instruction::Div(a) => {
                let divisor = self.memory.read(a);
                if divisor == 0.0 {
                    return Err(ExecError::DivisionByZero(a.clone()));
                }
                self.cpu.acc /= divisor;
            }
            Instruction::Set(value) => self.cpu.acc = *value,
            Instruction::Out => self.output.push(self.cpu.acc),
            Instruction::Halt => self.cpu.halt = true,
            Instruction::Jump(target) => {
                self.cpu.pc = program.resolve(target)?;
                return Ok(());
            }
            Instruction::Jz(target) => {
                let destination = program.resolve(target)?;
                if self.cpu.acc == 0.0 {
                    self.cpu.pc = destination;
                    return Ok(());
                }
            }
        }
        self.cpu.pc += 1;
        Ok(())
    }

    fn record(&mut self, row: &Row, instruction: &Instruction) {
        let line = match instruction {
            Instruction::Out => format!("{}: {} -> {}", row.address, instruction, self.cpu.acc),
            Instruction::Jump(_) | Instruction::Jz(_) => {
                format!("{}: {} | PC = {}", row.address, instruction, self.cpu.pc)
            }
            _ => format!("{}: {} | ACC = {}", row.address, instruction, self.cpu.acc),
        };
        self.trace.push(line);
    }

    fn fault(&mut self, row: Option<&Row>, error: ExecError) -> StopReason {
        warn!("run stopped at PC {}: {}", self.cpu.pc, error);
        let line = match row {
            Some(row) => format!("{}: {} | error: {}", row.address, row.text.trim(), error),
            None => error.to_string(),
        };
        self.trace.push(line);
        self.cpu.halt = true;
        StopReason::Fault(error)
    }

    fn finish(self, stop: StopReason) -> RunResult {
        info!("{} ({:?})", self.cpu, stop);
        RunResult {
            output: self.output,
            trace: self.trace,
            accumulator: self.cpu.acc,
            memory: self.memory.into_inner(),
            stop,
        }
    }
}

/// The chef: executes recipes against a copy of the pantry.
///
/// Each call to [`Interpreter::run`] starts from a fresh machine. The only
/// thing carried between runs is the optional decode cache.
#[derive(Default)]
pub struct Interpreter {
    config: RunConfig,
    decode_cache: Option<DecodeCache>,
}

impl Interpreter {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            decode_cache: None,
        }
    }

    /// Like [`Interpreter::new`], but keeps up to `capacity` decoded rows
    /// around between runs, keyed by their text.
    pub fn with_decode_cache(config: RunConfig, capacity: usize) -> Result<Self, EngineError> {
        let cache = DecodeCache::new(capacity)
            .map_err(|e| EngineError::DecodeCache(format!("{:?}", e)))?;
        Ok(Self {
            config,
            decode_cache: Some(cache),
        })
    }

    fn decode(&mut self, text: &str) -> Decoded {
        let Some(cache) = self.decode_cache.as_mut() else {
            return Instruction::decode(text);
        };

        let key = text.trim().to_string();
        if let Some(decoded) = cache.get_mut(&key) {
            return decoded.clone();
        }

        debug!("decode cache miss for `{}`", key);
        let decoded = Instruction::decode(&key);
        let _ = cache.put(key, decoded.clone());
        decoded
    }

    /// Runs `program` against a copy of `initial`. Never fails: faults are
    /// reported through the trace and [`RunResult::stop`].
    pub fn run(&mut self, program: &Program, initial: &BTreeMap<String, f64>) -> RunResult {
        let mut machine = Machine::new(Memory::from(initial.clone()));
        let mut steps = 0;

        let stop = loop {
            if machine.cpu.halt {
                break StopReason::Halted;
            }
            let Some(row) = program.rows().get(machine.cpu.pc) else {
                break StopReason::EndOfProgram;
            };
            if steps >= self.config.max_steps {
                break machine.fault(None, ExecError::StepBudgetExceeded(steps));
            }
            steps += 1;

            let instruction = match self.decode(&row.text) {
                Ok(Some(instruction)) => instruction,
                Ok(None) => {
                    machine.cpu.pc += 1;
                    continue;
                }
                Err(e) => break machine.fault(Some(row), e),
            };

            if let Err(e) = machine.execute(program, &instruction) {
                break machine.fault(Some(row), e);
            }
            machine.record(row, &instruction);
            machine.debug_state();
        };

        machine.finish(stop)
    }
}

/// Runs `program` once with the default configuration and no decode cache.
pub fn run(program: &Program, initial: &BTreeMap<String, f64>) -> RunResult {
    Interpreter::default().run(program, initial)
}

#[cfg(test)]
mod tests {

    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn memory(cells: &[(&str, f64)]) -> BTreeMap<String, f64> {
        cells.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    pub fn adds_two_cells() {
        init();
        let program = Program::parse("LOAD A0\nADD A1\nOUT\nHALT");
        let result = run(&program, &memory(&[("A0", 7.0), ("A1", 5.0)]));
        assert_eq!(result.output, vec![12.0]);
        assert_eq!(result.accumulator, 12.0);
        assert_eq!(result.stop, StopReason::Halted);
        assert_eq!(
            result.trace,
            vec!["0: LOAD A0 | ACC = 7", "1: ADD A1 | ACC = 12", "2: OUT -> 12", "3: HALT | ACC = 12"]
        );
    }

    #[test]
    pub fn store_writes_copy_not_caller_memory() {
        init();
        let initial = memory(&[("A0", 3.0)]);
        let program = Program::parse("LOAD A0\nMUL A0\nSTORE SQ");
        let result = run(&program, &initial);
        assert_eq!(result.memory, memory(&[("A0", 3.0), ("SQ", 9.0)]));
        assert_eq!(result.stop, StopReason::EndOfProgram);
        assert_eq!(initial, memory(&[("A0", 3.0)]));
    }

    #[test]
    pub fn division_by_zero_stops_run() {
        init();
        let program = Program::parse("LOAD A0\nOUT\nDIV A1\nOUT\nHALT");
        let result = run(&program, &memory(&[("A0", 8.0), ("A1", 0.0)]));
        assert_eq!(result.output, vec![8.0]);
        assert_eq!(
            result.stop,
            StopReason::Fault(ExecError::DivisionByZero("A1".into()))
        );
        let last = result.trace.last().unwrap();
        assert!(last.contains("division by zero"), "{}", last);
        assert_eq!(result.accumulator, 8.0);
    }

    #[test]
    pub fn division_uses_cell_value() {
        init();
        let program = Program::parse("SET 9\nDIV A1\nOUT");
        let result = run(&program, &memory(&[("A1", 2.0)]));
        assert_eq!(result.output, vec![4.5]);
    }

    #[test]
    pub fn jz_jumps_without_increment_when_zero() {
        init();
        let program = Program::parse("SET 0\nJZ 3\nSET 99\nOUT\nHALT");
        let result = run(&program, &BTreeMap::new());
        assert_eq!(result.output, vec![0.0]);
        assert_eq!(result.trace[1], "1: JZ 3 | PC = 3");
        assert_eq!(result.trace[2], "3: OUT -> 0");
    }

    #[test]
    pub fn jz_falls_through_when_not_zero() {
        init();
        let program = Program::parse("SET 1\nJZ 3\nSET 99\nOUT\nHALT");
        let result = run(&program, &BTreeMap::new());
        assert_eq!(result.output, vec![99.0]);
    }

    fn countdown() -> Program {
        Program::new(vec![
            Row::new("top", "LOAD N"),
            Row::new("check", "JZ done"),
            Row::new("", "OUT"),
            Row::new("", "SUB ONE"),
            Row::new("", "STORE N"),
            Row::new("", "JUMP top"),
            Row::new("done", "HALT"),
        ])
    }

    #[test]
    pub fn counts_down_with_labelled_loop() {
        init();
        let result = run(&countdown(), &memory(&[("N", 3.0), ("ONE", 1.0)]));
        assert_eq!(result.output, vec![3.0, 2.0, 1.0]);
        assert_eq!(result.memory["N"], 0.0);
        assert_eq!(result.stop, StopReason::Halted);
    }

    #[test]
    pub fn runaway_loop_hits_step_budget() {
        init();
        let program = Program::parse("SET 1\nJUMP 0");
        let result = run(&program, &BTreeMap::new());
        assert!(result.output.is_empty());
        assert_eq!(result.trace.len(), MAX_STEPS + 1);
        let last = result.trace.last().unwrap();
        assert!(last.contains("infinite loop"), "{}", last);
        assert_eq!(
            result.stop,
            StopReason::Fault(ExecError::StepBudgetExceeded(MAX_STEPS))
        );
    }

    #[test]
    pub fn step_budget_is_configurable() {
        init();
        let program = Program::parse("JUMP 0");
        let result = Interpreter::new(RunConfig { max_steps: 5 }).run(&program, &BTreeMap::new());
        assert_eq!(result.trace.len(), 6);
    }

    fn straight_line(rows: usize) -> Program {
        (0..rows).map(|i| Row::new(i.to_string(), "SET 1")).collect()
    }

    #[test]
    pub fn program_of_exactly_budget_length_completes() {
        init();
        let result = run(&straight_line(MAX_STEPS), &BTreeMap::new());
        assert_eq!(result.stop, StopReason::EndOfProgram);
        assert_eq!(result.trace.len(), MAX_STEPS);
        assert_eq!(result.accumulator, 1.0);
    }

    #[test]
    pub fn one_row_over_budget_faults() {
        init();
        let result = run(&straight_line(MAX_STEPS + 1), &BTreeMap::new());
        assert_eq!(
            result.stop,
            StopReason::Fault(ExecError::StepBudgetExceeded(MAX_STEPS))
        );
        assert_eq!(
            result.trace.last().map(String::as_str),
            Some("stopped after 100 steps: possible infinite loop")
        );
    }

    #[test]
    pub fn empty_program_returns_immediately() {
        init();
        let result = run(&Program::default(), &memory(&[("A0", 1.0)]));
        assert!(result.output.is_empty());
        assert!(result.trace.is_empty());
        assert_eq!(result.accumulator, 0.0);
        assert_eq!(result.stop, StopReason::EndOfProgram);
    }

    #[test]
    pub fn blank_rows_are_skipped() {
        init();
        let program = Program::new(vec![
            Row::new("0", "SET 4"),
            Row::new("1", ""),
            Row::new("2", "OUT"),
        ]);
        let result = run(&program, &BTreeMap::new());
        assert_eq!(result.output, vec![4.0]);
        assert_eq!(result.trace.len(), 2);
    }

    #[test]
    pub fn malformed_rows_become_trace_lines() {
        init();
        let cases = [
            ("SET 1\nOUT\nBAKE A0", "2: BAKE A0 | error: unknown opcode `BAKE`"),
            ("SET 1\nOUT\nLOAD", "2: LOAD | error: LOAD needs an operand"),
            (
                "SET 1\nOUT\nJUMP nowhere",
                "2: JUMP nowhere | error: jump target `nowhere` does not name an instruction",
            ),
        ];
        for (source, expected) in cases {
            let result = run(&Program::parse(source), &BTreeMap::new());
            assert_eq!(result.output, vec![1.0]);
            assert_eq!(result.trace.last().map(String::as_str), Some(expected));
            assert!(matches!(result.stop, StopReason::Fault(_)));
        }
    }

    #[test]
    pub fn jump_past_end_finishes_program() {
        init();
        let result = run(&Program::parse("JUMP 10\nOUT"), &BTreeMap::new());
        assert!(result.output.is_empty());
        assert_eq!(result.stop, StopReason::EndOfProgram);
    }

    #[test]
    pub fn reruns_are_deterministic() {
        init();
        let program = Program::parse("LOAD A0\nADD A1\nSTORE A2\nOUT\nDIV Z\nOUT");
        let initial = memory(&[("A0", 7.0), ("A1", 5.0), ("Z", 0.0)]);

        let first = run(&program, &initial);
        let second = run(&program, &initial);
        assert_eq!(first, second);

        let mut cached = Interpreter::with_decode_cache(RunConfig::default(), DECODE_CACHE_SIZE)
            .expect("decode cache");
        assert_eq!(cached.run(&program, &initial), first);
        assert_eq!(cached.run(&program, &initial), first);
    }

    #[test]
    pub fn evicting_decode_cache_keeps_results() {
        init();
        let program = countdown();
        let initial = memory(&[("N", 3.0), ("ONE", 1.0)]);
        let expected = run(&program, &initial);

        let mut cached = Interpreter::with_decode_cache(RunConfig::default(), 2)
            .expect("decode cache");
        assert_eq!(cached.run(&program, &initial), expected);
        assert_eq!(cached.run(&program, &initial), expected);
    }

    #[test]
    pub fn zero_capacity_decode_cache_is_rejected() {
        init();
        let cached = Interpreter::with_decode_cache(RunConfig::default(), 0);
        assert!(matches!(cached, Err(EngineError::DecodeCache(_))));
    }

    #[test]
    pub fn result_converts_into_tuple() {
        init();
        let result = run(&Program::parse("SET 2\nOUT"), &BTreeMap::new());
        let (output, trace, acc, memory): (Vec<f64>, Vec<String>, f64, BTreeMap<String, f64>) =
            result.into();
        assert_eq!(output, vec![2.0]);
        assert_eq!(trace.len(), 2);
        assert_eq!(acc, 2.0);
        assert!(memory.is_empty());
    }
}
