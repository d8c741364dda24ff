//! TypeScript type generation module.
//!
//! Exports TypeScript definitions for the request and response types of the
//! API so the web client can import them. Runs as a test.

#[cfg(test)]
mod tests {
    use std::{env, path::Path};

    use ts_rs::TS;

    #[test]
    fn generate_typescript_types() {
        let output_dir_str =
            env::var("WELLNESS_TS_OUTPUT_DIR").unwrap_or_else(|_| "../ts-bindings".to_string());
        let output_dir = Path::new(&output_dir_str);

        std::fs::create_dir_all(output_dir).expect("Failed to create output directory");

        // Remove stale definitions so renamed types do not linger
        for entry in std::fs::read_dir(output_dir).expect("Failed to read output directory") {
            let path = entry.expect("Failed to read directory entry").path();
            if path.extension().and_then(|s| s.to_str()) == Some("ts") {
                std::fs::remove_file(&path)
                    .unwrap_or_else(|e| panic!("Failed to remove {:?}: {}", path, e));
            }
        }

        use crate::api::auth::{AuthResponse, Credentials};
        use crate::api::health::HealthStatus;
        use crate::error::ErrorResponse;
        use crate::models::*;

        PublicUser::export_all_to(output_dir).expect("Failed to export PublicUser type");
        UserProfile::export_all_to(output_dir).expect("Failed to export UserProfile type");

        Session::export_all_to(output_dir).expect("Failed to export Session type");
        SessionWithOwner::export_all_to(output_dir)
            .expect("Failed to export SessionWithOwner type");
        SessionInput::export_all_to(output_dir).expect("Failed to export SessionInput type");
        SessionUpdate::export_all_to(output_dir).expect("Failed to export SessionUpdate type");

        Credentials::export_all_to(output_dir).expect("Failed to export Credentials type");
        AuthResponse::export_all_to(output_dir).expect("Failed to export AuthResponse type");
        ErrorResponse::export_all_to(output_dir).expect("Failed to export ErrorResponse type");
        HealthStatus::export_all_to(output_dir).expect("Failed to export HealthStatus type");

        assert!(output_dir.join("Session.ts").exists());
        println!("TypeScript types generated successfully in {:?}", output_dir);
    }
}
