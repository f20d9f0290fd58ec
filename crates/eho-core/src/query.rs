use serde::{Deserialize, Serialize};

/// Where a memory lives. Encoded into slot D20.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    #[default]
    Working,
    LongTerm,
    Cache,
}

impl MemoryType {
    pub fn encode(self) -> f64 {
        match self {
            MemoryType::Working => 0.0,
            MemoryType::LongTerm => 0.5,
            MemoryType::Cache => 1.0,
        }
    }
}

/// How often a memory is touched. Encoded into slot D21.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessFrequency {
    Hot,
    #[default]
    Warm,
    Cold,
}

impl AccessFrequency {
    pub fn encode(self) -> f64 {
        match self {
            AccessFrequency::Cold => 0.0,
            AccessFrequency::Warm => 0.5,
            AccessFrequency::Hot => 1.0,
        }
    }

    /// Hot and warm results feed the identity's fitness landscape.
    pub fn is_tracked(self) -> bool {
        !matches!(self, AccessFrequency::Cold)
    }
}

/// A retrieval request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryQuery {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<MemoryType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_frequency: Option<AccessFrequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
}

impl MemoryQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_memory_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = Some(memory_type);
        self
    }

    pub fn with_access_frequency(mut self, access_frequency: AccessFrequency) -> Self {
        self.access_frequency = Some(access_frequency);
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Identity the query is filed under, `default` when absent.
    pub fn identity_or_default(&self) -> &str {
        self.identity.as_deref().unwrap_or("default")
    }
}
