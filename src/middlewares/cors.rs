use actix_cors::Cors;

/// Panel frontends are served from other origins; tokens travel in the
/// `Authorization` header, so no cookies are involved.
pub fn create_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}
