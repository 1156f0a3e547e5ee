use cspcert::error::CspCertError;
use cspcert::provider::codes::{CRYPT_E_ASN1_BADTAG, CRYPT_E_INVALID_X500_STRING};
use cspcert::subject::{SubjectBlobCodec, SubjectIssuerBlob};

#[test]
fn encodes_and_decodes_names() {
    for dn in [
        "CN=test",
        "CN=example.com,O=Example Corp,C=US",
        "CN=Jane Doe,OU=Engineering,O=Example,L=Springfield,ST=Illinois,C=US",
    ] {
        let blob = SubjectBlobCodec::encode(dn).unwrap();
        assert!(!blob.is_empty());
        assert_eq!(blob.len() as usize, blob.data().len());
        assert_eq!(SubjectBlobCodec::decode(&blob).unwrap(), dn);
    }
}

#[test]
fn blob_is_a_der_sequence() {
    let blob = SubjectBlobCodec::encode("CN=test").unwrap();
    assert_eq!(blob.data()[0], 0x30);

    let name = SubjectBlobCodec::decode_name(&blob).unwrap();
    assert_eq!(name.0.len(), 1);
    assert_eq!(blob.clone().into_vec(), blob.data());
}

#[test]
fn empty_names_are_rejected() {
    for dn in ["", "   "] {
        let err = SubjectBlobCodec::encode(dn).unwrap_err();
        assert!(
            matches!(err, CspCertError::BlobEncoding { code, .. } if code == CRYPT_E_INVALID_X500_STRING),
            "{dn:?}: {err:?}"
        );
    }
}

#[test]
fn malformed_names_are_rejected() {
    for dn in ["not a name", "CN", "NOSUCHATTRIBUTE=value"] {
        let err = SubjectBlobCodec::encode(dn).unwrap_err();
        assert_eq!(err.native_code(), Some(CRYPT_E_INVALID_X500_STRING), "{dn:?}");
    }
}

#[test]
fn garbage_blobs_fail_to_decode() {
    let blob = SubjectIssuerBlob::from_der(vec![0x04, 0x02, 0xAB, 0xCD]).unwrap();
    let err = SubjectBlobCodec::decode(&blob).unwrap_err();
    assert!(
        matches!(err, CspCertError::BlobEncoding { code, .. } if code == CRYPT_E_ASN1_BADTAG),
        "{err:?}"
    );
}
