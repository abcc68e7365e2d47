use std::fmt;

/// Error returned when the engine refuses to grow any further.
///
/// Resource exhaustion is never retried: the operation that hit the limit is
/// abandoned and the error travels unchanged to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// Maximum number of live engine objects exceeded.
    Allocation { limit: usize, count: usize },
    /// An integer would need more limbs than the engine allows.
    Limbs { limit: usize, requested: usize },
    /// Maximum number of interruptible engine steps exceeded.
    Operation { limit: usize, count: usize },
    /// A list or permutation would grow past the allowed length.
    ListLength { limit: usize, requested: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation { limit, count } => {
                write!(f, "allocation limit exceeded: {count} > {limit}")
            }
            Self::Limbs { limit, requested } => {
                write!(f, "integer limb limit exceeded: {requested} > {limit}")
            }
            Self::Operation { limit, count } => {
                write!(f, "operation limit exceeded: {count} > {limit}")
            }
            Self::ListLength { limit, requested } => {
                write!(f, "list length limit exceeded: {requested} > {limit}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// Configuration for the in-process kernel.
///
/// All limits are optional - set to `None` to disable a specific limit.
/// Use `ResourceLimits::default()` for no limits, or build custom limits
/// with the builder pattern. List length is capped at a fixed ceiling even
/// when `max_list_length` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceLimits {
    /// Maximum number of live heap bags.
    pub max_objects: Option<usize>,
    /// Maximum number of limbs in a single large integer.
    pub max_limbs: Option<usize>,
    /// Maximum number of interruptible steps per outermost bracket.
    pub max_operations: Option<usize>,
    /// Maximum length of a single list, string or permutation.
    pub max_list_length: Option<usize>,
    /// Run the collector at the outermost `leave` every N allocations.
    pub gc_interval: Option<usize>,
}

impl ResourceLimits {
    /// Creates limits with the default list length cap and collection interval.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_list_length: Some(DEFAULT_MAX_LIST_LENGTH),
            gc_interval: Some(DEFAULT_GC_INTERVAL),
            ..Default::default()
        }
    }

    /// Sets the maximum number of live heap bags.
    #[must_use]
    pub fn max_objects(mut self, limit: usize) -> Self {
        self.max_objects = Some(limit);
        self
    }

    /// Sets the maximum limb count of a single integer.
    #[must_use]
    pub fn max_limbs(mut self, limit: usize) -> Self {
        self.max_limbs = Some(limit);
        self
    }

    /// Sets the maximum number of interruptible steps per outermost bracket.
    #[must_use]
    pub fn max_operations(mut self, limit: usize) -> Self {
        self.max_operations = Some(limit);
        self
    }

    /// Sets the maximum length of a single list or permutation.
    #[must_use]
    pub fn max_list_length(mut self, limit: usize) -> Self {
        self.max_list_length = Some(limit);
        self
    }

    /// Sets the collection interval; `None` disables automatic collection.
    #[must_use]
    pub fn gc_interval(mut self, interval: Option<usize>) -> Self {
        self.gc_interval = interval;
        self
    }
}

/// Allocations between two automatic collections unless configured otherwise.
pub const DEFAULT_GC_INTERVAL: usize = 10_000;

/// Longest list the kernel builds unless configured otherwise.
pub const DEFAULT_MAX_LIST_LENGTH: usize = 1 << 24;

/// Absolute ceiling on list length, applied even when no limit is configured.
const HARD_MAX_LIST_LENGTH: usize = 1 << 28;

/// Counts kernel resource usage against a [`ResourceLimits`].
///
/// The operation counter is per outermost bracket: [`Self::reset_operations`]
/// is called when the engine is left for the last time.
#[derive(Debug, Clone, Default)]
pub(crate) struct LimitTracker {
    limits: ResourceLimits,
    live_objects: usize,
    operation_count: usize,
    allocations_since_gc: usize,
}

impl LimitTracker {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            ..Default::default()
        }
    }

    /// Called before each bag allocation.
    pub fn on_allocate(&mut self) -> Result<(), ResourceError> {
        if let Some(max) = self.limits.max_objects
            && self.live_objects >= max
        {
            return Err(ResourceError::Allocation {
                limit: max,
                count: self.live_objects + 1,
            });
        }
        self.live_objects += 1;
        self.allocations_since_gc += 1;
        Ok(())
    }

    /// Called when the collector frees `count` bags.
    pub fn on_free(&mut self, count: usize) {
        self.live_objects = self.live_objects.saturating_sub(count);
    }

    /// Checks that an integer with `limbs` limbs may be created.
    pub fn check_limbs(&self, limbs: usize) -> Result<(), ResourceError> {
        match self.limits.max_limbs {
            Some(max) if limbs > max => Err(ResourceError::Limbs {
                limit: max,
                requested: limbs,
            }),
            _ => Ok(()),
        }
    }

    /// Checks that a list may hold `len` entries.
    pub fn check_list_length(&self, len: usize) -> Result<(), ResourceError> {
        let limit = self.limits.max_list_length.map_or(HARD_MAX_LIST_LENGTH, |max| max.min(HARD_MAX_LIST_LENGTH));
        if len > limit {
            return Err(ResourceError::ListLength { limit, requested: len });
        }
        Ok(())
    }

    /// Counts one interruptible step.
    pub fn check_operation(&mut self) -> Result<(), ResourceError> {
        self.operation_count += 1;
        match self.limits.max_operations {
            Some(max) if self.operation_count > max => Err(ResourceError::Operation {
                limit: max,
                count: self.operation_count,
            }),
            _ => Ok(()),
        }
    }

    pub fn reset_operations(&mut self) {
        self.operation_count = 0;
    }

    /// True once enough allocations have happened to warrant a collection.
    pub fn should_collect(&self) -> bool {
        self.limits
            .gc_interval
            .is_some_and(|interval| self.allocations_since_gc >= interval)
    }

    pub fn on_collect(&mut self) {
        self.allocations_since_gc = 0;
    }
}
