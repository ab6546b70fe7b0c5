use std::collections::BTreeMap;

pub trait Addressable<T> {
    fn read(&self, address: &str) -> T;
    fn write(&mut self, address: &str, value: T);
}

/// The pantry: named cells holding numbers. Cells that were never written
/// read as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Memory {
    cells: BTreeMap<String, f64>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &str) -> Option<f64> {
        self.cells.get(address).copied()
    }

    pub fn into_inner(self) -> BTreeMap<String, f64> {
        self.cells
    }
}

impl Addressable<f64> for Memory {
    fn read(&self, address: &str) -> f64 {
        self.get(address).unwrap_or(0.0)
    }

    fn write(&mut self, address: &str, value: f64) {
        self.cells.insert(address.to_string(), value);
    }
}

impl From<BTreeMap<String, f64>> for Memory {
    fn from(cells: BTreeMap<String, f64>) -> Self {
        Self { cells }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Memory {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
