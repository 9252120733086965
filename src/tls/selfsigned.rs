//! Ephemeral self-signed certificates
//!
//! Servers configured without a certificate get a fresh EC P-256 key and a
//! self-signed certificate for `localhost`, valid for one year.

use crate::error::Result;
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::extension::{BasicConstraints, SubjectAlternativeName};
use openssl::x509::{X509Builder, X509NameBuilder, X509};

/// Common name used when none is given
pub const DEFAULT_COMMON_NAME: &str = "localhost";

/// Certificate and matching private key
pub struct SelfSigned {
    pub cert: X509,
    pub key: PKey<Private>,
}

impl SelfSigned {
    /// Generate a certificate for `common_name`, also listed as a DNS SAN
    pub fn generate(common_name: &str) -> Result<Self> {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)?;
        let key = PKey::from_ec_key(EcKey::generate(&group)?)?;

        let mut name = X509NameBuilder::new()?;
        name.append_entry_by_nid(Nid::COMMONNAME, common_name)?;
        let name = name.build();

        let serial = {
            let mut bn = BigNum::new()?;
            bn.rand(64, MsbOption::MAYBE_ZERO, false)?;
            bn.to_asn1_integer()?
        };

        let mut builder = X509Builder::new()?;
        builder.set_version(2)?;
        builder.set_serial_number(&serial)?;
        builder.set_subject_name(&name)?;
        builder.set_issuer_name(&name)?;
        builder.set_pubkey(&key)?;
        let not_before = Asn1Time::days_from_now(0)?;
        let not_after = Asn1Time::days_from_now(365)?;
        builder.set_not_before(&not_before)?;
        builder.set_not_after(&not_after)?;

        builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
        let san = SubjectAlternativeName::new()
            .dns(common_name)
            .build(&builder.x509v3_context(None, None))?;
        builder.append_extension(san)?;
        builder.sign(&key, MessageDigest::sha256())?;

        Ok(SelfSigned {
            cert: builder.build(),
            key,
        })
    }

    /// Certificate followed by the PKCS#8 key, PEM encoded
    pub fn to_pem(&self) -> Result<Vec<u8>> {
        let mut pem = self.cert.to_pem()?;
        pem.extend_from_slice(&self.key.private_key_to_pem_pkcs8()?);
        Ok(pem)
    }
}
