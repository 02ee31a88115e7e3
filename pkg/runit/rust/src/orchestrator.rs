// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::errors::Result;
use crate::resource::{ChildResource, ResourceKey};
use crate::template::TemplateRenderer;
use std::collections::HashMap;

/// Children converged during one pass, keyed by (path, kind).
///
/// A child executes the first time it is referenced. Later references in the
/// same pass return its cached `changed` flag. Dropping the cache ends the
/// pass.
pub struct ChildResources<'a> {
    renderer: &'a dyn TemplateRenderer,
    changed: HashMap<ResourceKey, bool>,
    order: Vec<ResourceKey>,
}

impl<'a> ChildResources<'a> {
    pub fn new(renderer: &'a dyn TemplateRenderer) -> Self {
        Self {
            renderer,
            changed: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Execute `child` unless it already ran in this pass.
    pub fn converge(&mut self, child: ChildResource) -> Result<bool> {
        let key = child.key();
        if let Some(&changed) = self.changed.get(&key) {
            return Ok(changed);
        }
        let changed = child.converge(self.renderer)?;
        self.changed.insert(key.clone(), changed);
        self.order.push(key);
        Ok(changed)
    }

    /// The cached flag of a child. False when the child never ran.
    pub fn changed(&self, key: &ResourceKey) -> bool {
        self.changed.get(key).copied().unwrap_or(false)
    }

    pub fn executed(&self) -> &[ResourceKey] {
        &self.order
    }

    /// How many children this pass actually changed.
    pub fn changed_count(&self) -> usize {
        self.changed.values().filter(|c| **c).count()
    }
}
