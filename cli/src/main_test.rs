use super::*;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("pms").chain(args.iter().copied())).unwrap()
}

// =============================================================================
// argument parsing
// =============================================================================

#[test]
fn login_takes_identifier_and_password() {
    let cli = parse(&["login", "pharmacist1", "--password", "secret"]);
    match cli.command {
        Command::Login { username_or_email, password } => {
            assert_eq!(username_or_email, "pharmacist1");
            assert_eq!(password, "secret");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn route_check_accepts_permission() {
    let cli = parse(&["route-check", "/dashboard/access", "--permission", "user:read"]);
    match cli.command {
        Command::RouteCheck { path, permission } => {
            assert_eq!(path, "/dashboard/access");
            assert_eq!(permission.as_deref(), Some("user:read"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn register_args_build_request() {
    let cli = parse(&["register", "--username", "tech1", "--email", "tech@example.com", "--last-name", "Silva"]);
    let Command::Register(args) = cli.command else {
        panic!("expected register");
    };
    let request = args.into_request();
    assert_eq!(request.username, "tech1");
    assert_eq!(request.last_name, "Silva");
    assert_eq!(request.first_name, "");
    assert_eq!(request.phone, None);
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["pms", "sudo"]).is_err());
}

// =============================================================================
// output
// =============================================================================

#[test]
fn describes_guard_outcomes() {
    assert_eq!(describe_guard(&GuardOutcome::Render), "render");
    assert_eq!(describe_guard(&GuardOutcome::Redirect("/unauthorized".into())), "redirect to /unauthorized");
}

#[test]
fn describes_init_states() {
    assert_eq!(describe_init(InitState::AuthenticatedStay), "authenticated");
    assert_eq!(describe_init(InitState::UnauthenticatedRedirect), "signed out, redirected");
}

#[test]
fn server_messages_pass_through() {
    let err = CliError::from(AuthError::InvalidCredentials("Invalid credentials".into()));
    assert_eq!(err.to_string(), "Invalid credentials");
}

#[test]
fn storage_errors_keep_their_detail() {
    let err = CliError::from(AuthError::Storage("/tmp/pms/session.json: permission denied".into()));
    assert_eq!(err.to_string(), "storage error: /tmp/pms/session.json: permission denied");
}

#[test]
fn network_errors_keep_their_detail() {
    let err = CliError::from(AuthError::Network("connection refused".into()));
    assert_eq!(err.to_string(), "network error: connection refused");
}
