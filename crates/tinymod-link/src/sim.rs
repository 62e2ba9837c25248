//! In-memory stand-ins for the serial line, for tests and simulators.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tinymod_core::{ByteSink, ByteSource, RegisterTable};

/// One end of a pair of crossed byte queues.
///
/// What one end writes, the other reads, like a null-modem cable. Both
/// ends are `Send`, so a master and a slave can run on separate threads.
#[derive(Debug, Clone)]
pub struct PipeLink {
    rx: Arc<Mutex<VecDeque<u8>>>,
    tx: Arc<Mutex<VecDeque<u8>>>,
}

impl PipeLink {
    /// Create both ends of a simulated serial line.
    pub fn pair() -> (PipeLink, PipeLink) {
        let a_to_b = Arc::new(Mutex::new(VecDeque::new()));
        let b_to_a = Arc::new(Mutex::new(VecDeque::new()));
        (
            PipeLink {
                rx: Arc::clone(&b_to_a),
                tx: Arc::clone(&a_to_b),
            },
            PipeLink {
                rx: a_to_b,
                tx: b_to_a,
            },
        )
    }
}

impl ByteSource for PipeLink {
    fn available(&mut self) -> bool {
        !self.rx.lock().expect("pipe lock poisoned").is_empty()
    }

    fn read_byte(&mut self) -> u8 {
        self.rx
            .lock()
            .expect("pipe lock poisoned")
            .pop_front()
            .unwrap_or(0)
    }
}

impl ByteSink for PipeLink {
    fn write(&mut self, bytes: &[u8]) {
        self.tx.lock().expect("pipe lock poisoned").extend(bytes);
    }
}

/// Owned holding registers for simulators and tests.
///
/// The engine itself only ever borrows a [`RegisterTable`] view, so the
/// bank stays the single owner and the dispatcher the single writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterBank {
    values: Vec<u16>,
    base: u16,
}

impl RegisterBank {
    pub fn new(size: usize) -> Self {
        Self::with_base(size, 0)
    }

    pub fn with_base(size: usize, base: u16) -> Self {
        Self {
            values: vec![0u16; size],
            base,
        }
    }

    pub fn from_values(values: Vec<u16>) -> Self {
        Self { values, base: 0 }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[u16] {
        &self.values
    }

    pub fn get(&self, address: u16) -> Option<u16> {
        let index = usize::from(address).checked_sub(usize::from(self.base))?;
        self.values.get(index).copied()
    }

    pub fn set(&mut self, address: u16, value: u16) -> bool {
        let Some(index) = usize::from(address).checked_sub(usize::from(self.base)) else {
            return false;
        };
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// The view lent to the engine for one dispatch cycle.
    pub fn table(&mut self) -> RegisterTable<'_> {
        RegisterTable::with_base(&mut self.values, self.base)
    }
}
