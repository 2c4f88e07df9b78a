use crate::error::TabJarError;

pub fn exit_code_for_error(err: &TabJarError) -> i32 {
    match err {
        TabJarError::InvalidUrl(_) => 3,
        TabJarError::Config(_) | TabJarError::InvalidHeader(_) => 2,
        TabJarError::Timeout => 28,
        TabJarError::FileNotFound(_) => 37,
        TabJarError::Io(_) => 23,
        TabJarError::Json(_) => 26,
        TabJarError::Http(err) => http_exit_code(err),
        TabJarError::UnknownTab(_) | TabJarError::TabNotIsolated(_) => 64,
        TabJarError::CookieRejected(_) => 65,
    }
}

fn http_exit_code(err: &reqwest::Error) -> i32 {
    if err.is_timeout() {
        return 28;
    }
    if err.is_connect() {
        return 7;
    }
    if err.is_request() {
        return 2;
    }
    43
}
