// SPDX-License-Identifier: CEPL-1.0
use thiserror::Error;

use crate::chain::Stage;
use crate::driver::DriverError;

/// The hardware on offer cannot run the chain at all.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no physical device enumerated")]
    NoPhysicalDevice,
    #[error("no queue family with graphics support")]
    NoGraphicsQueue,
    #[error("no queue family can present to the surface")]
    NoPresentQueue,
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("configuration error while creating {stage}: {source}")]
    Configuration {
        stage: Stage,
        #[source]
        source: ConfigurationError,
    },
    #[error("failed to create {stage}")]
    StageCreation {
        stage: Stage,
        #[source]
        source: DriverError,
    },
}

impl InitError {
    pub(crate) fn stage_creation(stage: Stage) -> impl FnOnce(DriverError) -> Self {
        move |source| Self::StageCreation { stage, source }
    }

    pub(crate) fn configuration(stage: Stage, source: ConfigurationError) -> Self {
        Self::Configuration { stage, source }
    }

    /// Stage that was being entered when initialization stopped.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Configuration { stage, .. } | Self::StageCreation { stage, .. } => *stage,
        }
    }
}
