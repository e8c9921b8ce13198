//! Per-platform tag extractors
//!
//! Each function reads one CI platform's fixed variable scheme into a raw
//! tag set. Unset variables produce empty strings here; the normalizer
//! prunes them afterwards.

use std::collections::BTreeMap;

use crate::env::EnvSnapshot;
use crate::normalize::normalize_ref;
use crate::tags::{self, TagSet};

/// Serializes a curated subset of raw provider variables as a JSON object,
/// skipping unset ones. Deterministic key order via BTreeMap.
fn env_vars_json(pairs: &[(&str, &str)]) -> String {
    let map: BTreeMap<&str, &str> = pairs
        .iter()
        .copied()
        .filter(|(_, value)| !value.is_empty())
        .collect();
    serde_json::to_string(&map).unwrap_or_default()
}

/// Splits a combined `Name <email>` author string.
///
/// Returns None when either part is missing or empty, so malformed input
/// degrades to absent author tags instead of failing extraction.
fn split_author(raw: &str) -> Option<(String, String)> {
    let open = raw.find('<')?;
    let close = raw[open..].find('>')? + open;
    let name = raw[..open].trim();
    let email = raw[open + 1..close].trim();
    if name.is_empty() || email.is_empty() {
        return None;
    }
    Some((name.to_string(), email.to_string()))
}

pub(super) fn appveyor(env: &EnvSnapshot) -> TagSet {
    let mut tags = TagSet::new();
    let repo_name = env.get("APPVEYOR_REPO_NAME");
    let build_id = env.get("APPVEYOR_BUILD_ID");
    let url = format!("https://ci.appveyor.com/project/{repo_name}/builds/{build_id}");

    tags.insert(tags::CI_PROVIDER_NAME, "appveyor".to_string());
    if env.get("APPVEYOR_REPO_PROVIDER") == "github" {
        tags.insert(
            tags::GIT_REPOSITORY_URL,
            format!("https://github.com/{repo_name}.git"),
        );
    } else {
        tags.insert(tags::GIT_REPOSITORY_URL, repo_name.to_string());
    }

    tags.insert(tags::GIT_COMMIT_SHA, env.get("APPVEYOR_REPO_COMMIT").to_string());
    tags.insert(
        tags::GIT_BRANCH,
        env.first_of(&["APPVEYOR_PULL_REQUEST_HEAD_REPO_BRANCH", "APPVEYOR_REPO_BRANCH"])
            .to_string(),
    );
    tags.insert(tags::GIT_TAG, env.get("APPVEYOR_REPO_TAG_NAME").to_string());

    tags.insert(tags::CI_WORKSPACE_PATH, env.get("APPVEYOR_BUILD_FOLDER").to_string());
    tags.insert(tags::CI_PIPELINE_ID, build_id.to_string());
    tags.insert(tags::CI_PIPELINE_NAME, repo_name.to_string());
    tags.insert(tags::CI_PIPELINE_NUMBER, env.get("APPVEYOR_BUILD_NUMBER").to_string());
    tags.insert(tags::CI_PIPELINE_URL, url.clone());
    tags.insert(tags::CI_JOB_URL, url);

    // The extended message is optional; joining unconditionally would leave
    // a lone newline when both parts are unset.
    let mut message = env.get("APPVEYOR_REPO_COMMIT_MESSAGE").to_string();
    let extended = env.get("APPVEYOR_REPO_COMMIT_MESSAGE_EXTENDED");
    if !extended.is_empty() {
        if message.is_empty() {
            message = extended.to_string();
        } else {
            message = format!("{message}\n{extended}");
        }
    }
    tags.insert(tags::GIT_COMMIT_MESSAGE, message);
    tags.insert(
        tags::GIT_COMMIT_AUTHOR_NAME,
        env.get("APPVEYOR_REPO_COMMIT_AUTHOR").to_string(),
    );
    tags.insert(
        tags::GIT_COMMIT_AUTHOR_EMAIL,
        env.get("APPVEYOR_REPO_COMMIT_AUTHOR_EMAIL").to_string(),
    );
    tags
}

pub(super) fn azure_pipelines(env: &EnvSnapshot) -> TagSet {
    let mut tags = TagSet::new();
    let base_url = format!(
        "{}{}/_build/results?buildId={}",
        env.get("SYSTEM_TEAMFOUNDATIONSERVERURI"),
        env.get("SYSTEM_TEAMPROJECTID"),
        env.get("BUILD_BUILDID"),
    );
    let job_url = format!(
        "{}&view=logs&j={}&t={}",
        base_url,
        env.get("SYSTEM_JOBID"),
        env.get("SYSTEM_TASKINSTANCEID"),
    );

    let branch_or_tag = env.first_of(&[
        "SYSTEM_PULLREQUEST_SOURCEBRANCH",
        "BUILD_SOURCEBRANCH",
        "BUILD_SOURCEBRANCHNAME",
    ]);
    let (branch, tag) = if branch_or_tag.contains("tags/") {
        ("", branch_or_tag)
    } else {
        (branch_or_tag, "")
    };

    tags.insert(tags::CI_PROVIDER_NAME, "azurepipelines".to_string());
    tags.insert(tags::CI_WORKSPACE_PATH, env.get("BUILD_SOURCESDIRECTORY").to_string());

    tags.insert(tags::CI_PIPELINE_ID, env.get("BUILD_BUILDID").to_string());
    tags.insert(tags::CI_PIPELINE_NAME, env.get("BUILD_DEFINITIONNAME").to_string());
    tags.insert(tags::CI_PIPELINE_NUMBER, env.get("BUILD_BUILDID").to_string());
    tags.insert(tags::CI_PIPELINE_URL, base_url);

    tags.insert(tags::CI_STAGE_NAME, env.get("SYSTEM_STAGEDISPLAYNAME").to_string());

    tags.insert(tags::CI_JOB_NAME, env.get("SYSTEM_JOBDISPLAYNAME").to_string());
    tags.insert(tags::CI_JOB_URL, job_url);

    tags.insert(
        tags::GIT_REPOSITORY_URL,
        env.first_of(&["SYSTEM_PULLREQUEST_SOURCEREPOSITORYURI", "BUILD_REPOSITORY_URI"])
            .to_string(),
    );
    tags.insert(
        tags::GIT_COMMIT_SHA,
        env.first_of(&["SYSTEM_PULLREQUEST_SOURCECOMMITID", "BUILD_SOURCEVERSION"])
            .to_string(),
    );
    tags.insert(tags::GIT_BRANCH, branch.to_string());
    tags.insert(tags::GIT_TAG, tag.to_string());
    tags.insert(tags::GIT_COMMIT_MESSAGE, env.get("BUILD_SOURCEVERSIONMESSAGE").to_string());
    tags.insert(tags::GIT_COMMIT_AUTHOR_NAME, env.get("BUILD_REQUESTEDFORID").to_string());
    tags.insert(
        tags::GIT_COMMIT_AUTHOR_EMAIL,
        env.get("BUILD_REQUESTEDFOREMAIL").to_string(),
    );

    tags.insert(
        tags::CI_ENV_VARS,
        env_vars_json(&[
            ("SYSTEM_TEAMPROJECTID", env.get("SYSTEM_TEAMPROJECTID")),
            ("BUILD_BUILDID", env.get("BUILD_BUILDID")),
            ("SYSTEM_JOBID", env.get("SYSTEM_JOBID")),
        ]),
    );
    tags
}

pub(super) fn bitbucket(env: &EnvSnapshot) -> TagSet {
    let mut tags = TagSet::new();
    let url = format!(
        "https://bitbucket.org/{}/addon/pipelines/home#!/results/{}",
        env.get("BITBUCKET_REPO_FULL_NAME"),
        env.get("BITBUCKET_BUILD_NUMBER"),
    );

    tags.insert(tags::CI_PROVIDER_NAME, "bitbucket".to_string());
    tags.insert(tags::GIT_REPOSITORY_URL, env.get("BITBUCKET_GIT_SSH_ORIGIN").to_string());
    tags.insert(tags::GIT_COMMIT_SHA, env.get("BITBUCKET_COMMIT").to_string());
    tags.insert(tags::GIT_BRANCH, env.get("BITBUCKET_BRANCH").to_string());
    tags.insert(tags::GIT_TAG, env.get("BITBUCKET_TAG").to_string());
    tags.insert(tags::CI_WORKSPACE_PATH, env.get("BITBUCKET_CLONE_DIR").to_string());
    tags.insert(
        tags::CI_PIPELINE_ID,
        env.get("BITBUCKET_PIPELINE_UUID")
            .trim_matches(['{', '}'])
            .to_string(),
    );
    tags.insert(tags::CI_PIPELINE_NUMBER, env.get("BITBUCKET_BUILD_NUMBER").to_string());
    tags.insert(tags::CI_PIPELINE_NAME, env.get("BITBUCKET_REPO_FULL_NAME").to_string());
    tags.insert(tags::CI_PIPELINE_URL, url.clone());
    tags.insert(tags::CI_JOB_URL, url);
    tags
}

pub(super) fn bitrise(env: &EnvSnapshot) -> TagSet {
    let mut tags = TagSet::new();
    tags.insert(tags::CI_PROVIDER_NAME, "bitrise".to_string());
    tags.insert(tags::GIT_REPOSITORY_URL, env.get("GIT_REPOSITORY_URL").to_string());
    tags.insert(
        tags::GIT_COMMIT_SHA,
        env.first_of(&["BITRISE_GIT_COMMIT", "GIT_CLONE_COMMIT_HASH"]).to_string(),
    );
    tags.insert(
        tags::GIT_BRANCH,
        env.first_of(&["BITRISEIO_GIT_BRANCH_DEST", "BITRISE_GIT_BRANCH"]).to_string(),
    );
    tags.insert(tags::GIT_TAG, env.get("BITRISE_GIT_TAG").to_string());
    tags.insert(tags::CI_WORKSPACE_PATH, env.get("BITRISE_SOURCE_DIR").to_string());
    tags.insert(tags::CI_PIPELINE_ID, env.get("BITRISE_BUILD_SLUG").to_string());
    tags.insert(
        tags::CI_PIPELINE_NAME,
        env.get("BITRISE_TRIGGERED_WORKFLOW_ID").to_string(),
    );
    tags.insert(tags::CI_PIPELINE_NUMBER, env.get("BITRISE_BUILD_NUMBER").to_string());
    tags.insert(tags::CI_PIPELINE_URL, env.get("BITRISE_BUILD_URL").to_string());
    tags.insert(tags::GIT_COMMIT_MESSAGE, env.get("BITRISE_GIT_MESSAGE").to_string());
    tags
}

pub(super) fn buddy(env: &EnvSnapshot) -> TagSet {
    let mut tags = TagSet::new();
    tags.insert(tags::CI_PROVIDER_NAME, "buddy".to_string());
    tags.insert(
        tags::CI_PIPELINE_ID,
        format!(
            "{}/{}",
            env.get("BUDDY_PIPELINE_ID"),
            env.get("BUDDY_EXECUTION_ID"),
        ),
    );
    tags.insert(tags::CI_PIPELINE_NAME, env.get("BUDDY_PIPELINE_NAME").to_string());
    tags.insert(tags::CI_PIPELINE_NUMBER, env.get("BUDDY_EXECUTION_ID").to_string());
    tags.insert(tags::CI_PIPELINE_URL, env.get("BUDDY_EXECUTION_URL").to_string());
    tags.insert(tags::GIT_COMMIT_SHA, env.get("BUDDY_EXECUTION_REVISION").to_string());
    tags.insert(tags::GIT_REPOSITORY_URL, env.get("BUDDY_SCM_URL").to_string());
    tags.insert(tags::GIT_BRANCH, env.get("BUDDY_EXECUTION_BRANCH").to_string());
    tags.insert(tags::GIT_TAG, env.get("BUDDY_EXECUTION_TAG").to_string());
    tags.insert(
        tags::GIT_COMMIT_MESSAGE,
        env.get("BUDDY_EXECUTION_REVISION_MESSAGE").to_string(),
    );
    tags.insert(
        tags::GIT_COMMIT_COMMITTER_NAME,
        env.get("BUDDY_EXECUTION_REVISION_COMMITTER_NAME").to_string(),
    );
    tags.insert(
        tags::GIT_COMMIT_COMMITTER_EMAIL,
        env.get("BUDDY_EXECUTION_REVISION_COMMITTER_EMAIL").to_string(),
    );
    tags
}

pub(super) fn buildkite(env: &EnvSnapshot) -> TagSet {
    let mut tags = TagSet::new();
    tags.insert(tags::GIT_BRANCH, env.get("BUILDKITE_BRANCH").to_string());
    tags.insert(tags::GIT_COMMIT_SHA, env.get("BUILDKITE_COMMIT").to_string());
    tags.insert(tags::GIT_REPOSITORY_URL, env.get("BUILDKITE_REPO").to_string());
    tags.insert(tags::GIT_TAG, env.get("BUILDKITE_TAG").to_string());
    tags.insert(tags::CI_PIPELINE_ID, env.get("BUILDKITE_BUILD_ID").to_string());
    tags.insert(tags::CI_PIPELINE_NAME, env.get("BUILDKITE_PIPELINE_SLUG").to_string());
    tags.insert(tags::CI_PIPELINE_NUMBER, env.get("BUILDKITE_BUILD_NUMBER").to_string());
    tags.insert(tags::CI_PIPELINE_URL, env.get("BUILDKITE_BUILD_URL").to_string());
    tags.insert(
        tags::CI_JOB_URL,
        format!(
            "{}#{}",
            env.get("BUILDKITE_BUILD_URL"),
            env.get("BUILDKITE_JOB_ID"),
        ),
    );
    tags.insert(tags::CI_PROVIDER_NAME, "buildkite".to_string());
    tags.insert(
        tags::CI_WORKSPACE_PATH,
        env.get("BUILDKITE_BUILD_CHECKOUT_PATH").to_string(),
    );
    tags.insert(tags::GIT_COMMIT_MESSAGE, env.get("BUILDKITE_MESSAGE").to_string());
    tags.insert(
        tags::GIT_COMMIT_AUTHOR_NAME,
        env.get("BUILDKITE_BUILD_AUTHOR").to_string(),
    );
    tags.insert(
        tags::GIT_COMMIT_AUTHOR_EMAIL,
        env.get("BUILDKITE_BUILD_AUTHOR_EMAIL").to_string(),
    );

    tags.insert(
        tags::CI_ENV_VARS,
        env_vars_json(&[
            ("BUILDKITE_BUILD_ID", env.get("BUILDKITE_BUILD_ID")),
            ("BUILDKITE_JOB_ID", env.get("BUILDKITE_JOB_ID")),
        ]),
    );
    tags
}

pub(super) fn circleci(env: &EnvSnapshot) -> TagSet {
    let mut tags = TagSet::new();
    tags.insert(tags::CI_PROVIDER_NAME, "circleci".to_string());
    tags.insert(tags::GIT_REPOSITORY_URL, env.get("CIRCLE_REPOSITORY_URL").to_string());
    tags.insert(tags::GIT_COMMIT_SHA, env.get("CIRCLE_SHA1").to_string());
    tags.insert(tags::GIT_TAG, env.get("CIRCLE_TAG").to_string());
    tags.insert(tags::GIT_BRANCH, env.get("CIRCLE_BRANCH").to_string());
    tags.insert(tags::CI_WORKSPACE_PATH, env.get("CIRCLE_WORKING_DIRECTORY").to_string());
    tags.insert(tags::CI_PIPELINE_ID, env.get("CIRCLE_WORKFLOW_ID").to_string());
    tags.insert(tags::CI_PIPELINE_NAME, env.get("CIRCLE_PROJECT_REPONAME").to_string());
    tags.insert(tags::CI_PIPELINE_NUMBER, env.get("CIRCLE_BUILD_NUM").to_string());
    tags.insert(
        tags::CI_PIPELINE_URL,
        format!(
            "https://app.circleci.com/pipelines/workflows/{}",
            env.get("CIRCLE_WORKFLOW_ID"),
        ),
    );
    tags.insert(tags::CI_JOB_NAME, env.get("CIRCLE_JOB").to_string());
    tags.insert(tags::CI_JOB_URL, env.get("CIRCLE_BUILD_URL").to_string());

    tags.insert(
        tags::CI_ENV_VARS,
        env_vars_json(&[
            ("CIRCLE_BUILD_NUM", env.get("CIRCLE_BUILD_NUM")),
            ("CIRCLE_WORKFLOW_ID", env.get("CIRCLE_WORKFLOW_ID")),
        ]),
    );
    tags
}

pub(super) fn github_actions(env: &EnvSnapshot) -> TagSet {
    let mut tags = TagSet::new();
    let branch_or_tag = env.first_of(&["GITHUB_HEAD_REF", "GITHUB_REF"]);
    let (branch, tag) = if branch_or_tag.contains("tags/") {
        ("", branch_or_tag)
    } else {
        (branch_or_tag, "")
    };

    let mut server_url = env.get("GITHUB_SERVER_URL");
    if server_url.is_empty() {
        server_url = "https://github.com";
    }
    let server_url = server_url.trim_end_matches('/');

    let raw_repository = format!("{server_url}/{}", env.get("GITHUB_REPOSITORY"));
    let pipeline_id = env.get("GITHUB_RUN_ID");
    let commit_sha = env.get("GITHUB_SHA");

    tags.insert(tags::CI_PROVIDER_NAME, "github".to_string());
    tags.insert(tags::GIT_REPOSITORY_URL, format!("{raw_repository}.git"));
    tags.insert(tags::GIT_COMMIT_SHA, commit_sha.to_string());
    tags.insert(tags::GIT_BRANCH, branch.to_string());
    tags.insert(tags::GIT_TAG, tag.to_string());
    tags.insert(tags::CI_WORKSPACE_PATH, env.get("GITHUB_WORKSPACE").to_string());
    tags.insert(tags::CI_PIPELINE_ID, pipeline_id.to_string());
    tags.insert(tags::CI_PIPELINE_NUMBER, env.get("GITHUB_RUN_NUMBER").to_string());
    tags.insert(tags::CI_PIPELINE_NAME, env.get("GITHUB_WORKFLOW").to_string());
    tags.insert(
        tags::CI_JOB_URL,
        format!("{raw_repository}/commit/{commit_sha}/checks"),
    );
    tags.insert(tags::CI_JOB_NAME, env.get("GITHUB_JOB").to_string());

    let attempts = env.get("GITHUB_RUN_ATTEMPT");
    if attempts.is_empty() {
        tags.insert(
            tags::CI_PIPELINE_URL,
            format!("{raw_repository}/actions/runs/{pipeline_id}"),
        );
    } else {
        tags.insert(
            tags::CI_PIPELINE_URL,
            format!("{raw_repository}/actions/runs/{pipeline_id}/attempts/{attempts}"),
        );
    }

    tags.insert(
        tags::CI_ENV_VARS,
        env_vars_json(&[
            ("GITHUB_SERVER_URL", env.get("GITHUB_SERVER_URL")),
            ("GITHUB_REPOSITORY", env.get("GITHUB_REPOSITORY")),
            ("GITHUB_RUN_ID", env.get("GITHUB_RUN_ID")),
            ("GITHUB_RUN_ATTEMPT", env.get("GITHUB_RUN_ATTEMPT")),
        ]),
    );
    tags
}

pub(super) fn gitlab(env: &EnvSnapshot) -> TagSet {
    let mut tags = TagSet::new();
    let url = env.get("CI_PIPELINE_URL").replace("/-/pipelines/", "/pipelines/");

    tags.insert(tags::CI_PROVIDER_NAME, "gitlab".to_string());
    tags.insert(tags::GIT_REPOSITORY_URL, env.get("CI_REPOSITORY_URL").to_string());
    tags.insert(tags::GIT_COMMIT_SHA, env.get("CI_COMMIT_SHA").to_string());
    tags.insert(
        tags::GIT_BRANCH,
        env.first_of(&["CI_COMMIT_BRANCH", "CI_COMMIT_REF_NAME"]).to_string(),
    );
    tags.insert(tags::GIT_TAG, env.get("CI_COMMIT_TAG").to_string());
    tags.insert(tags::CI_WORKSPACE_PATH, env.get("CI_PROJECT_DIR").to_string());
    tags.insert(tags::CI_PIPELINE_ID, env.get("CI_PIPELINE_ID").to_string());
    tags.insert(tags::CI_PIPELINE_NAME, env.get("CI_PROJECT_PATH").to_string());
    tags.insert(tags::CI_PIPELINE_NUMBER, env.get("CI_PIPELINE_IID").to_string());
    tags.insert(tags::CI_PIPELINE_URL, url);
    tags.insert(tags::CI_JOB_URL, env.get("CI_JOB_URL").to_string());
    tags.insert(tags::CI_JOB_NAME, env.get("CI_JOB_NAME").to_string());
    tags.insert(tags::CI_STAGE_NAME, env.get("CI_JOB_STAGE").to_string());
    tags.insert(tags::GIT_COMMIT_MESSAGE, env.get("CI_COMMIT_MESSAGE").to_string());

    if let Some((name, email)) = split_author(env.get("CI_COMMIT_AUTHOR")) {
        tags.insert(tags::GIT_COMMIT_AUTHOR_NAME, name);
        tags.insert(tags::GIT_COMMIT_AUTHOR_EMAIL, email);
    }
    tags.insert(
        tags::GIT_COMMIT_AUTHOR_DATE,
        env.get("CI_COMMIT_TIMESTAMP").to_string(),
    );

    tags.insert(
        tags::CI_ENV_VARS,
        env_vars_json(&[
            ("CI_PROJECT_URL", env.get("CI_PROJECT_URL")),
            ("CI_PIPELINE_ID", env.get("CI_PIPELINE_ID")),
            ("CI_JOB_ID", env.get("CI_JOB_ID")),
        ]),
    );
    tags
}

pub(super) fn jenkins(env: &EnvSnapshot) -> TagSet {
    let mut tags = TagSet::new();
    tags.insert(tags::CI_PROVIDER_NAME, "jenkins".to_string());
    tags.insert(
        tags::GIT_REPOSITORY_URL,
        env.first_of(&["GIT_URL", "GIT_URL_1"]).to_string(),
    );
    tags.insert(tags::GIT_COMMIT_SHA, env.get("GIT_COMMIT").to_string());

    let branch_or_tag = env.get("GIT_BRANCH");
    let mut name = env.get("JOB_NAME").to_string();

    if branch_or_tag.contains("tags/") {
        tags.insert(tags::GIT_TAG, branch_or_tag.to_string());
    } else {
        tags.insert(tags::GIT_BRANCH, branch_or_tag.to_string());
        // Multibranch jobs embed the branch in the job name.
        let branch = normalize_ref(branch_or_tag);
        if !branch.is_empty() {
            name = name.replace(&format!("/{branch}"), "");
        }
    }
    name = strip_job_parameters(&name);

    tags.insert(tags::CI_WORKSPACE_PATH, env.get("WORKSPACE").to_string());
    tags.insert(tags::CI_PIPELINE_ID, env.get("BUILD_TAG").to_string());
    tags.insert(tags::CI_PIPELINE_NUMBER, env.get("BUILD_NUMBER").to_string());
    tags.insert(tags::CI_PIPELINE_NAME, name);
    tags.insert(tags::CI_PIPELINE_URL, env.get("BUILD_URL").to_string());

    tags.insert(
        tags::CI_ENV_VARS,
        env_vars_json(&[(
            "TESTBEAM_CUSTOM_TRACE_ID",
            env.get("TESTBEAM_CUSTOM_TRACE_ID"),
        )]),
    );
    tags
}

/// Drops `key=value` path segments that parameterized Jenkins jobs append
/// to `JOB_NAME`.
fn strip_job_parameters(name: &str) -> String {
    let mut segments = name.split('/');
    let mut out = segments.next().unwrap_or("").to_string();
    for segment in segments {
        if segment.contains('=') {
            continue;
        }
        out.push('/');
        out.push_str(segment);
    }
    out
}

pub(super) fn teamcity(env: &EnvSnapshot) -> TagSet {
    let mut tags = TagSet::new();
    tags.insert(tags::CI_PROVIDER_NAME, "teamcity".to_string());
    tags.insert(tags::GIT_REPOSITORY_URL, env.get("BUILD_VCS_URL").to_string());
    tags.insert(tags::GIT_COMMIT_SHA, env.get("BUILD_VCS_NUMBER").to_string());
    tags.insert(tags::CI_WORKSPACE_PATH, env.get("BUILD_CHECKOUTDIR").to_string());
    tags.insert(tags::CI_PIPELINE_ID, env.get("BUILD_ID").to_string());
    tags.insert(tags::CI_PIPELINE_NUMBER, env.get("BUILD_NUMBER").to_string());
    tags.insert(
        tags::CI_PIPELINE_URL,
        format!(
            "{}/viewLog.html?buildId={}",
            env.get("SERVER_URL"),
            env.get("BUILD_ID"),
        ),
    );
    tags
}

pub(super) fn travis(env: &EnvSnapshot) -> TagSet {
    let mut tags = TagSet::new();
    let mut repo_slug = env.get("TRAVIS_PULL_REQUEST_SLUG");
    if repo_slug.trim().is_empty() {
        repo_slug = env.get("TRAVIS_REPO_SLUG");
    }
    tags.insert(tags::CI_PROVIDER_NAME, "travisci".to_string());
    tags.insert(
        tags::GIT_REPOSITORY_URL,
        format!("https://github.com/{repo_slug}.git"),
    );
    tags.insert(tags::GIT_COMMIT_SHA, env.get("TRAVIS_COMMIT").to_string());
    tags.insert(tags::GIT_TAG, env.get("TRAVIS_TAG").to_string());
    tags.insert(
        tags::GIT_BRANCH,
        env.first_of(&["TRAVIS_PULL_REQUEST_BRANCH", "TRAVIS_BRANCH"]).to_string(),
    );
    tags.insert(tags::CI_WORKSPACE_PATH, env.get("TRAVIS_BUILD_DIR").to_string());
    tags.insert(tags::CI_PIPELINE_ID, env.get("TRAVIS_BUILD_ID").to_string());
    tags.insert(tags::CI_PIPELINE_NUMBER, env.get("TRAVIS_BUILD_NUMBER").to_string());
    tags.insert(tags::CI_PIPELINE_NAME, repo_slug.to_string());
    tags.insert(tags::CI_PIPELINE_URL, env.get("TRAVIS_BUILD_WEB_URL").to_string());
    tags.insert(tags::CI_JOB_URL, env.get("TRAVIS_JOB_WEB_URL").to_string());
    tags.insert(tags::GIT_COMMIT_MESSAGE, env.get("TRAVIS_COMMIT_MESSAGE").to_string());
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags;

    #[test]
    fn test_split_author_well_formed() {
        let (name, email) = split_author("Ada Lovelace <ada@example.com>").unwrap();
        assert_eq!(name, "Ada Lovelace");
        assert_eq!(email, "ada@example.com");
    }

    #[test]
    fn test_split_author_malformed_degrades() {
        assert!(split_author("no-delimiters").is_none());
        assert!(split_author("<only@email.com>").is_none());
        assert!(split_author("Name Only <>").is_none());
        assert!(split_author("").is_none());
    }

    #[test]
    fn test_env_vars_json_skips_unset() {
        let blob = env_vars_json(&[("A", "1"), ("B", ""), ("C", "3")]);
        assert_eq!(blob, r#"{"A":"1","C":"3"}"#);
    }

    #[test]
    fn test_strip_job_parameters() {
        assert_eq!(strip_job_parameters("job/KEY=qwerty/master"), "job/master");
        assert_eq!(strip_job_parameters("job/master"), "job/master");
        assert_eq!(strip_job_parameters(""), "");
    }

    #[test]
    fn test_github_full_extraction() {
        let env = EnvSnapshot::from_pairs([
            ("GITHUB_SHA", "b9f0fb3fdbb94c9d24b2c75b49663122a529e123"),
            ("GITHUB_SERVER_URL", "https://github.com/"),
            ("GITHUB_REPOSITORY", "acme/widget"),
            ("GITHUB_RUN_ID", "12345"),
            ("GITHUB_RUN_NUMBER", "4"),
            ("GITHUB_RUN_ATTEMPT", "2"),
            ("GITHUB_WORKFLOW", "ci"),
            ("GITHUB_JOB", "unit"),
            ("GITHUB_REF", "refs/heads/main"),
            ("GITHUB_WORKSPACE", "/home/runner/work/widget"),
        ]);
        let t = github_actions(&env);
        assert_eq!(t[tags::CI_PROVIDER_NAME], "github");
        assert_eq!(t[tags::GIT_REPOSITORY_URL], "https://github.com/acme/widget.git");
        assert_eq!(t[tags::GIT_BRANCH], "refs/heads/main");
        assert_eq!(t[tags::GIT_TAG], "");
        assert_eq!(
            t[tags::CI_PIPELINE_URL],
            "https://github.com/acme/widget/actions/runs/12345/attempts/2"
        );
        assert_eq!(
            t[tags::CI_JOB_URL],
            "https://github.com/acme/widget/commit/b9f0fb3fdbb94c9d24b2c75b49663122a529e123/checks"
        );
        assert!(t[tags::CI_ENV_VARS].contains("\"GITHUB_RUN_ID\":\"12345\""));
    }

    #[test]
    fn test_github_tag_ref_goes_to_tag_field() {
        let env = EnvSnapshot::from_pairs([
            ("GITHUB_SHA", "abc"),
            ("GITHUB_REF", "refs/tags/v1.2.3"),
        ]);
        let t = github_actions(&env);
        assert_eq!(t[tags::GIT_TAG], "refs/tags/v1.2.3");
        assert_eq!(t[tags::GIT_BRANCH], "");
    }

    #[test]
    fn test_github_pipeline_url_without_attempts() {
        let env = EnvSnapshot::from_pairs([
            ("GITHUB_SHA", "abc"),
            ("GITHUB_REPOSITORY", "acme/widget"),
            ("GITHUB_RUN_ID", "77"),
        ]);
        let t = github_actions(&env);
        assert_eq!(
            t[tags::CI_PIPELINE_URL],
            "https://github.com/acme/widget/actions/runs/77"
        );
    }

    #[test]
    fn test_gitlab_pipeline_url_rewrite_and_author() {
        let env = EnvSnapshot::from_pairs([
            ("GITLAB_CI", "true"),
            ("CI_PIPELINE_URL", "https://gitlab.example/acme/widget/-/pipelines/99"),
            ("CI_COMMIT_AUTHOR", "Ada Lovelace <ada@example.com>"),
            ("CI_COMMIT_BRANCH", "main"),
        ]);
        let t = gitlab(&env);
        assert_eq!(
            t[tags::CI_PIPELINE_URL],
            "https://gitlab.example/acme/widget/pipelines/99"
        );
        assert_eq!(t[tags::GIT_COMMIT_AUTHOR_NAME], "Ada Lovelace");
        assert_eq!(t[tags::GIT_COMMIT_AUTHOR_EMAIL], "ada@example.com");
        assert_eq!(t[tags::GIT_BRANCH], "main");
    }

    #[test]
    fn test_gitlab_malformed_author_omits_fields() {
        let env = EnvSnapshot::from_pairs([
            ("GITLAB_CI", "true"),
            ("CI_COMMIT_AUTHOR", "not an author string"),
        ]);
        let t = gitlab(&env);
        assert!(!t.contains_key(tags::GIT_COMMIT_AUTHOR_NAME));
        assert!(!t.contains_key(tags::GIT_COMMIT_AUTHOR_EMAIL));
    }

    #[test]
    fn test_jenkins_branch_removed_from_job_name() {
        let env = EnvSnapshot::from_pairs([
            ("JENKINS_URL", "https://jenkins.example"),
            ("JOB_NAME", "widget/master"),
            ("GIT_BRANCH", "origin/master"),
        ]);
        let t = jenkins(&env);
        assert_eq!(t[tags::CI_PIPELINE_NAME], "widget");
        assert_eq!(t[tags::GIT_BRANCH], "origin/master");
    }

    #[test]
    fn test_jenkins_tag_branch_goes_to_tag_field() {
        let env = EnvSnapshot::from_pairs([
            ("JENKINS_URL", "https://jenkins.example"),
            ("GIT_BRANCH", "origin/tags/v1.0"),
        ]);
        let t = jenkins(&env);
        assert_eq!(t[tags::GIT_TAG], "origin/tags/v1.0");
        assert!(!t.contains_key(tags::GIT_BRANCH));
    }

    #[test]
    fn test_appveyor_github_repository_url() {
        let env = EnvSnapshot::from_pairs([
            ("APPVEYOR", "True"),
            ("APPVEYOR_REPO_PROVIDER", "github"),
            ("APPVEYOR_REPO_NAME", "acme/widget"),
            ("APPVEYOR_BUILD_ID", "1234"),
        ]);
        let t = appveyor(&env);
        assert_eq!(t[tags::GIT_REPOSITORY_URL], "https://github.com/acme/widget.git");
        assert_eq!(
            t[tags::CI_PIPELINE_URL],
            "https://ci.appveyor.com/project/acme/widget/builds/1234"
        );
    }

    #[test]
    fn test_appveyor_commit_message_join() {
        let env = EnvSnapshot::from_pairs([
            ("APPVEYOR", "True"),
            ("APPVEYOR_REPO_COMMIT_MESSAGE", "fix the flux capacitor"),
            ("APPVEYOR_REPO_COMMIT_MESSAGE_EXTENDED", "details follow"),
        ]);
        let t = appveyor(&env);
        assert_eq!(t[tags::GIT_COMMIT_MESSAGE], "fix the flux capacitor\ndetails follow");

        let env = EnvSnapshot::from_pairs([("APPVEYOR", "True")]);
        let t = appveyor(&env);
        assert_eq!(t[tags::GIT_COMMIT_MESSAGE], "");
    }

    #[test]
    fn test_azure_branch_vs_tag() {
        let env = EnvSnapshot::from_pairs([
            ("TF_BUILD", "True"),
            ("BUILD_SOURCEBRANCH", "refs/tags/v2.0"),
        ]);
        let t = azure_pipelines(&env);
        assert_eq!(t[tags::GIT_TAG], "refs/tags/v2.0");
        assert_eq!(t[tags::GIT_BRANCH], "");

        let env = EnvSnapshot::from_pairs([
            ("TF_BUILD", "True"),
            ("BUILD_SOURCEBRANCH", "refs/heads/main"),
        ]);
        let t = azure_pipelines(&env);
        assert_eq!(t[tags::GIT_BRANCH], "refs/heads/main");
        assert_eq!(t[tags::GIT_TAG], "");
    }

    #[test]
    fn test_azure_job_url_appends_log_view() {
        let env = EnvSnapshot::from_pairs([
            ("TF_BUILD", "True"),
            ("SYSTEM_TEAMFOUNDATIONSERVERURI", "https://dev.azure.example/"),
            ("SYSTEM_TEAMPROJECTID", "proj"),
            ("BUILD_BUILDID", "42"),
            ("SYSTEM_JOBID", "j1"),
            ("SYSTEM_TASKINSTANCEID", "t1"),
        ]);
        let t = azure_pipelines(&env);
        assert_eq!(
            t[tags::CI_PIPELINE_URL],
            "https://dev.azure.example/proj/_build/results?buildId=42"
        );
        assert_eq!(
            t[tags::CI_JOB_URL],
            "https://dev.azure.example/proj/_build/results?buildId=42&view=logs&j=j1&t=t1"
        );
    }

    #[test]
    fn test_bitbucket_uuid_braces_trimmed() {
        let env = EnvSnapshot::from_pairs([
            ("BITBUCKET_COMMIT", "abc"),
            ("BITBUCKET_PIPELINE_UUID", "{d6d6e3c1-4a2b-4f3a-9f7d-8a3e1b2c3d4e}"),
        ]);
        let t = bitbucket(&env);
        assert_eq!(t[tags::CI_PIPELINE_ID], "d6d6e3c1-4a2b-4f3a-9f7d-8a3e1b2c3d4e");
    }

    #[test]
    fn test_buddy_composite_pipeline_id() {
        let env = EnvSnapshot::from_pairs([
            ("BUDDY", "true"),
            ("BUDDY_PIPELINE_ID", "11"),
            ("BUDDY_EXECUTION_ID", "250"),
        ]);
        let t = buddy(&env);
        assert_eq!(t[tags::CI_PIPELINE_ID], "11/250");
        assert_eq!(t[tags::CI_PIPELINE_NUMBER], "250");
    }

    #[test]
    fn test_buildkite_job_url_fragment() {
        let env = EnvSnapshot::from_pairs([
            ("BUILDKITE", "true"),
            ("BUILDKITE_BUILD_URL", "https://buildkite.example/builds/9"),
            ("BUILDKITE_JOB_ID", "j-77"),
        ]);
        let t = buildkite(&env);
        assert_eq!(t[tags::CI_JOB_URL], "https://buildkite.example/builds/9#j-77");
    }

    #[test]
    fn test_travis_pull_request_slug_preferred() {
        let env = EnvSnapshot::from_pairs([
            ("TRAVIS", "true"),
            ("TRAVIS_PULL_REQUEST_SLUG", "fork/widget"),
            ("TRAVIS_REPO_SLUG", "acme/widget"),
            ("TRAVIS_PULL_REQUEST_BRANCH", "feature"),
            ("TRAVIS_BRANCH", "main"),
        ]);
        let t = travis(&env);
        assert_eq!(t[tags::GIT_REPOSITORY_URL], "https://github.com/fork/widget.git");
        assert_eq!(t[tags::CI_PIPELINE_NAME], "fork/widget");
        assert_eq!(t[tags::GIT_BRANCH], "feature");
    }

    #[test]
    fn test_bitrise_fallback_variables() {
        let env = EnvSnapshot::from_pairs([
            ("BITRISE_BUILD_SLUG", "slug-1"),
            ("GIT_CLONE_COMMIT_HASH", "deadbeef"),
            ("BITRISE_GIT_BRANCH", "develop"),
        ]);
        let t = bitrise(&env);
        assert_eq!(t[tags::GIT_COMMIT_SHA], "deadbeef");
        assert_eq!(t[tags::GIT_BRANCH], "develop");
        assert_eq!(t[tags::CI_PIPELINE_ID], "slug-1");
    }

    #[test]
    fn test_teamcity_pipeline_url() {
        let env = EnvSnapshot::from_pairs([
            ("TEAMCITY_VERSION", "2023.1"),
            ("SERVER_URL", "https://tc.example"),
            ("BUILD_ID", "512"),
        ]);
        let t = teamcity(&env);
        assert_eq!(t[tags::CI_PIPELINE_URL], "https://tc.example/viewLog.html?buildId=512");
    }
}
