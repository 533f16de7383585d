//! Application-defined item: a number with a "regenerate" action

use formwork_core::{AnyItem, FormItem, FormNode, ItemKind, PropertyPath, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::any::Any;
use std::cell::RefCell;
use std::ops::{Deref, Range};
use std::rc::Rc;

/// Bound integer regenerated on `invoke`
#[derive(Clone)]
pub struct RandomNumberItem {
    item: FormItem<i32>,
    rng: Rc<RefCell<StdRng>>,
    range: Range<i32>,
}

impl RandomNumberItem {
    pub fn new(path: PropertyPath<i32>) -> Self {
        Self::with_rng(path, StdRng::from_entropy())
    }

    /// Deterministic generator for reproducible runs
    pub fn seeded(path: PropertyPath<i32>, seed: u64) -> Self {
        Self::with_rng(path, StdRng::seed_from_u64(seed))
    }

    fn with_rng(path: PropertyPath<i32>, rng: StdRng) -> Self {
        Self {
            item: FormItem::new(path).with_display(),
            rng: Rc::new(RefCell::new(rng)),
            range: 0..100,
        }
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.item.set_label(Some(label.into()));
        self
    }

    /// Write a fresh number different from the current one
    pub fn regenerate(&self) -> i32 {
        let current = self.item.value();
        let next = {
            let mut rng = self.rng.borrow_mut();
            loop {
                let candidate = rng.gen_range(self.range.clone());
                if candidate != current || self.range.len() < 2 {
                    break candidate;
                }
            }
        };

        self.item.set_value(next);
        next
    }
}

impl Deref for RandomNumberItem {
    type Target = FormItem<i32>;

    fn deref(&self) -> &FormItem<i32> {
        &self.item
    }
}

impl FormNode for RandomNumberItem {
    fn item(&self) -> &dyn AnyItem {
        &self.item
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Custom("random-number")
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn invoke(&self) -> Result<()> {
        if self.item.is_read_only() {
            return Ok(());
        }
        let value = self.regenerate();
        tracing::debug!(item = %self.item.id(), value, "Regenerated number");
        Ok(())
    }
}
