use octocrab::Error as OctocrabError;

#[derive(Debug)]
pub enum GitHubError {
    TokenNotFound(String),
    ApiError(OctocrabError),
    /// The API answered but not with something the orchestrator can use.
    InvalidResponse(String),
}

impl GitHubError {
    /// HTTP status of the failed call, when GitHub reported one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GitHubError::ApiError(octocrab::Error::GitHub { source, .. }) => {
                Some(source.status_code.as_u16())
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

impl From<OctocrabError> for GitHubError {
    fn from(err: OctocrabError) -> Self {
        GitHubError::ApiError(err)
    }
}

impl std::fmt::Display for GitHubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitHubError::TokenNotFound(msg) => {
                writeln!(f, "GitHub Authentication Error")?;
                writeln!(f, "──────────────────────────")?;
                write!(f, "🔑 {msg}\n\n")?;
                writeln!(f, "🔧 QUICK FIXES:")?;
                writeln!(f, "   → Pass the workflow token: with: token: ${{{{ secrets.GITHUB_TOKEN }}}}")?;
                write!(
                    f,
                    "   → Grant the job 'contents: write' and 'pull-requests: write' permissions"
                )
            }
            GitHubError::ApiError(octocrab_err) => {
                writeln!(f, "GitHub API Error")?;
                writeln!(f, "────────────────")?;

                match octocrab_err {
                    octocrab::Error::GitHub { source, .. } => {
                        writeln!(f, "🌐 HTTP {}: {}", source.status_code, source.message)?;
                        writeln!(f)?;

                        match source.status_code.as_u16() {
                            401 => {
                                writeln!(f, "🔧 AUTHENTICATION FAILED:")?;
                                writeln!(f, "   → Token is invalid or expired")?;
                                write!(f, "   → Check the 'token' input of the workflow step")
                            }
                            403 => {
                                writeln!(f, "🔧 PERMISSION DENIED:")?;
                                writeln!(f, "   → Token lacks required permissions")?;
                                writeln!(f, "   → Releases and tags need 'contents: write'")?;
                                write!(f, "   → Pull requests and comments need 'pull-requests: write'")
                            }
                            404 => {
                                writeln!(f, "🔧 RESOURCE NOT FOUND:")?;
                                writeln!(f, "   → Repository, branch or release may not exist")?;
                                write!(f, "   → Verify GITHUB_REPOSITORY and the base branch")
                            }
                            422 => {
                                writeln!(f, "🔧 VALIDATION ERROR:")?;
                                writeln!(f, "   → Request data is invalid")?;
                                write!(f, "   → A release or tag with the same name may already exist")
                            }
                            _ => {
                                writeln!(f, "🔧 TROUBLESHOOTING:")?;
                                writeln!(f, "   → Re-run the job; every step is attempted once per run")?;
                                write!(f, "   → Check GitHub status: https://www.githubstatus.com")
                            }
                        }
                    }
                    octocrab::Error::Http { .. } => {
                        writeln!(f, "🌐 Network connection failed to GitHub API")?;
                        writeln!(f)?;
                        writeln!(f, "🏗️  CI/CD ENVIRONMENT TROUBLESHOOTING:")?;
                        writeln!(f, "   → Check for custom network configurations or runners")?;
                        write!(f, "   → Test: curl -v https://api.github.com")
                    }
                    _ => {
                        write!(f, "🌐 {octocrab_err}\n\n")?;
                        writeln!(f, "🔧 TROUBLESHOOTING:")?;
                        write!(f, "   → Re-run the job with RUST_LOG=debug for request details")
                    }
                }
            }
            GitHubError::InvalidResponse(msg) => {
                writeln!(f, "Unexpected GitHub Response")?;
                writeln!(f, "──────────────────────────")?;
                write!(f, "📄 {msg}")
            }
        }
    }
}

impl std::error::Error for GitHubError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GitHubError::ApiError(err) => Some(err),
            _ => None,
        }
    }
}
