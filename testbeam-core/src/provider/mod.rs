//! CI provider registry
//!
//! Associates each supported platform with a trigger variable (a variable
//! whose mere presence signals that platform is hosting the run) and the
//! extractor that reads its variable scheme.

mod extractors;

use crate::env::EnvSnapshot;
use crate::tags::TagSet;

/// A supported CI platform.
pub struct ProviderDescriptor {
    /// Variable whose presence (any value, empty included) selects this
    /// provider.
    pub trigger: &'static str,
    /// Value written to the provider-name tag by the extractor.
    pub name: &'static str,
    /// Reads the platform's variable scheme into a raw tag set.
    pub extract: fn(&EnvSnapshot) -> TagSet,
}

/// Supported providers in priority order: alphabetical by provider name,
/// first present trigger wins. The order is deliberate so that runs with
/// several trigger variables set (nested CI, leftover variables) resolve
/// deterministically.
pub const PROVIDERS: &[ProviderDescriptor] = &[
    ProviderDescriptor {
        trigger: "APPVEYOR",
        name: "appveyor",
        extract: extractors::appveyor,
    },
    ProviderDescriptor {
        trigger: "TF_BUILD",
        name: "azurepipelines",
        extract: extractors::azure_pipelines,
    },
    ProviderDescriptor {
        trigger: "BITBUCKET_COMMIT",
        name: "bitbucket",
        extract: extractors::bitbucket,
    },
    ProviderDescriptor {
        trigger: "BITRISE_BUILD_SLUG",
        name: "bitrise",
        extract: extractors::bitrise,
    },
    ProviderDescriptor {
        trigger: "BUDDY",
        name: "buddy",
        extract: extractors::buddy,
    },
    ProviderDescriptor {
        trigger: "BUILDKITE",
        name: "buildkite",
        extract: extractors::buildkite,
    },
    ProviderDescriptor {
        trigger: "CIRCLECI",
        name: "circleci",
        extract: extractors::circleci,
    },
    ProviderDescriptor {
        trigger: "GITHUB_SHA",
        name: "github",
        extract: extractors::github_actions,
    },
    ProviderDescriptor {
        trigger: "GITLAB_CI",
        name: "gitlab",
        extract: extractors::gitlab,
    },
    ProviderDescriptor {
        trigger: "JENKINS_URL",
        name: "jenkins",
        extract: extractors::jenkins,
    },
    ProviderDescriptor {
        trigger: "TEAMCITY_VERSION",
        name: "teamcity",
        extract: extractors::teamcity,
    },
    ProviderDescriptor {
        trigger: "TRAVIS",
        name: "travisci",
        extract: extractors::travis,
    },
];

/// Selects the active provider and runs its extractor.
///
/// Returns an empty tag set when no trigger variable is present (local
/// runs). Values may still contain empty strings at this stage; the
/// normalizer prunes them.
pub fn detect(env: &EnvSnapshot) -> TagSet {
    for provider in PROVIDERS {
        if env.contains(provider.trigger) {
            return (provider.extract)(env);
        }
    }
    TagSet::new()
}
