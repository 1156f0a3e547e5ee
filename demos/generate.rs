use std::sync::Arc;
use std::time::Duration;

use cspcert::cert::params::{ExtensionParam, ProviderParams, SelfSignedRequest, SignatureAlgorithm, ValidityPeriod};
use cspcert::factory::{SelfSignedCertificateFactory, create_self_signed_with_timeout};
use cspcert::provider::software::SOFTWARE_PROVIDER_NAME;
use cspcert::provider::{
    CALG_ED25519, CRYPT_VERIFYCONTEXT, PROV_EC_ECDSA_SIG, PROV_RSA_AES, SoftwareProvider,
    key_length_flags,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let provider = SoftwareProvider::new();
    let factory = SelfSignedCertificateFactory::new(&provider);

    // A CA-style certificate: RSA 3072, basic constraints cA=TRUE
    let validity = ValidityPeriod::for_days(3650)?;
    let ca_request = SelfSignedRequest::builder()
        .subject("CN=My Test CA,O=Example,C=US".to_string())
        .not_before(validity.not_before())
        .not_after(validity.not_after())
        .signature_algorithm(SignatureAlgorithm::Sha256WithRSA.into())
        .provider(
            ProviderParams::builder()
                .provider_name(SOFTWARE_PROVIDER_NAME.to_string())
                .provider_type(PROV_RSA_AES)
                .acquire_flags(CRYPT_VERIFYCONTEXT)
                .key_spec_flags(key_length_flags(3072))
                .build(),
        )
        .extensions(vec![ExtensionParam {
            oid: const_oid::db::rfc5280::ID_CE_BASIC_CONSTRAINTS,
            critical: true,
            value: vec![0x30, 0x03, 0x01, 0x01, 0xFF],
        }])
        .build();
    let ca_cert = factory.create_self_signed(&ca_request)?;
    println!("CA Certificate ({}):\n{}", ca_cert.thumbprint_hex(), ca_cert.to_pem());

    // An Ed25519 server certificate, bounded by a deadline
    let validity = ValidityPeriod::for_days(825)?;
    let server_request = SelfSignedRequest::builder()
        .subject("CN=myserver.local".to_string())
        .not_before(validity.not_before())
        .not_after(validity.not_after())
        .signature_algorithm(SignatureAlgorithm::Ed25519.into())
        .provider(
            ProviderParams::builder()
                .provider_name(SOFTWARE_PROVIDER_NAME.to_string())
                .provider_type(PROV_EC_ECDSA_SIG)
                .acquire_flags(CRYPT_VERIFYCONTEXT)
                .key_algorithm(CALG_ED25519)
                .build(),
        )
        .build();
    let server_cert = create_self_signed_with_timeout(
        Arc::new(SoftwareProvider::new()),
        server_request,
        Duration::from_secs(10),
    )?;
    println!(
        "Server Certificate ({}):\n{}",
        server_cert.thumbprint_hex(),
        server_cert.to_pem()
    );

    if let Some(dir) = std::env::args().nth(1) {
        std::fs::create_dir_all(&dir)?;
        std::fs::write(format!("{dir}/ca_cert.pem"), ca_cert.to_pem())?;
        std::fs::write(format!("{dir}/server_cert.der"), server_cert.as_bytes())?;
        println!("wrote certificates to {dir}");
    }

    Ok(())
}
