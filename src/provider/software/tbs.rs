use der::asn1::{Any, BitString, GeneralizedTime, OctetString, UtcTime};
use der::{Decode, Encode};
use x509_cert::Version;
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_cert::time::{Time, Validity};

use super::keys::SoftwareKey;
use crate::calendar::CalendarTime;
use crate::cert::params::{AlgorithmIdentifier, ExtensionParam, SignatureAlgorithm};
use crate::error::NativeCode;
use crate::provider::codes::{CRYPT_E_ASN1_BADTAG, ERROR_INVALID_PARAMETER, NTE_BAD_ALGID, NTE_FAIL};
use crate::subject::SubjectIssuerBlob;

/// DER encoding of ASN.1 NULL, the customary parameters of RSA signatures.
const DER_NULL: [u8; 2] = [0x05, 0x00];

const SERIAL_LEN: usize = 16;

/// Builds and signs a DER-encoded X.509 v3 certificate whose subject and
/// issuer are both the name in `subject_issuer`.
pub(crate) fn build_self_signed(
    key: &SoftwareKey,
    subject_issuer: &SubjectIssuerBlob,
    signature_algorithm: &AlgorithmIdentifier,
    start: &CalendarTime,
    end: &CalendarTime,
    extensions: &[ExtensionParam],
) -> Result<Vec<u8>, NativeCode> {
    let algorithm =
        SignatureAlgorithm::from_oid(&signature_algorithm.oid()).ok_or(NTE_BAD_ALGID)?;
    if !key.supports(algorithm) {
        return Err(NTE_BAD_ALGID);
    }

    let name = Name::from_der(subject_issuer.data()).map_err(|_| CRYPT_E_ASN1_BADTAG)?;
    let algorithm_id = AlgorithmIdentifierOwned {
        oid: signature_algorithm.oid(),
        parameters: algorithm_parameters(signature_algorithm, algorithm)?,
    };
    let validity = validity(start, end)?;

    let tbs_certificate = x509_cert::TbsCertificate {
        version: Version::V3,
        serial_number: random_serial()?,
        signature: algorithm_id.clone(),
        issuer: name.clone(),
        validity,
        subject: name,
        subject_public_key_info: key.subject_public_key_info()?,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: pass_through(extensions)?,
    };

    let tbs_der = tbs_certificate.to_der().map_err(|_| NTE_FAIL)?;
    let signature = key.sign(algorithm, &tbs_der)?;

    let certificate = x509_cert::Certificate {
        tbs_certificate,
        signature_algorithm: algorithm_id,
        signature: BitString::from_bytes(&signature).map_err(|_| NTE_FAIL)?,
    };
    certificate.to_der().map_err(|_| NTE_FAIL)
}

fn algorithm_parameters(
    identifier: &AlgorithmIdentifier,
    algorithm: SignatureAlgorithm,
) -> Result<Option<Any>, NativeCode> {
    match identifier.parameters() {
        Some(bytes) => Any::from_der(bytes).map(Some).map_err(|_| CRYPT_E_ASN1_BADTAG),
        None if algorithm.is_rsa() => Any::from_der(&DER_NULL).map(Some).map_err(|_| NTE_FAIL),
        None => Ok(None),
    }
}

fn validity(start: &CalendarTime, end: &CalendarTime) -> Result<Validity, NativeCode> {
    let start = to_date_time(start)?;
    let end = to_date_time(end)?;
    // X.509 validity has whole-second resolution; an empty period is rejected
    if start.unix_duration() >= end.unix_duration() {
        return Err(ERROR_INVALID_PARAMETER);
    }
    Ok(Validity {
        not_before: to_x509_time(start)?,
        not_after: to_x509_time(end)?,
    })
}

/// Milliseconds are dropped. Years before 1970 are rejected.
fn to_date_time(calendar: &CalendarTime) -> Result<der::DateTime, NativeCode> {
    let narrow = |value: u16| u8::try_from(value).map_err(|_| ERROR_INVALID_PARAMETER);
    der::DateTime::new(
        calendar.year,
        narrow(calendar.month)?,
        narrow(calendar.day)?,
        narrow(calendar.hour)?,
        narrow(calendar.minute)?,
        narrow(calendar.second)?,
    )
    .map_err(|_| ERROR_INVALID_PARAMETER)
}

/// UTCTime through 2049, GeneralizedTime from 2050 (RFC 5280 4.1.2.5).
///
/// `der::DateTime` starts at 1970, so earlier dates never reach this point:
/// [`to_date_time`] rejects them with `ERROR_INVALID_PARAMETER`.
fn to_x509_time(date_time: der::DateTime) -> Result<Time, NativeCode> {
    if (1950..2050).contains(&date_time.year()) {
        UtcTime::from_date_time(date_time)
            .map(Time::UtcTime)
            .map_err(|_| ERROR_INVALID_PARAMETER)
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(date_time)))
    }
}

/// A positive serial with its top byte pinned so the DER integer keeps all
/// sixteen bytes.
fn random_serial() -> Result<SerialNumber, NativeCode> {
    let mut serial: [u8; SERIAL_LEN] = rand::random();
    serial[0] = (serial[0] & 0x7F) | 0x40;
    SerialNumber::new(&serial).map_err(|_| NTE_FAIL)
}

fn pass_through(extensions: &[ExtensionParam]) -> Result<Option<Vec<Extension>>, NativeCode> {
    if extensions.is_empty() {
        return Ok(None);
    }
    extensions
        .iter()
        .map(|ext| {
            Ok(Extension {
                extn_id: ext.oid,
                critical: ext.critical,
                extn_value: OctetString::new(ext.value.clone()).map_err(|_| ERROR_INVALID_PARAMETER)?,
            })
        })
        .collect::<Result<Vec<_>, NativeCode>>()
        .map(Some)
}
