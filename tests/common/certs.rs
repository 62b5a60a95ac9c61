// Generate a fresh self-signed certificate for `subject_alt_name` and return it as PEM text.
pub(crate) fn self_signed_pem(subject_alt_name: &str) -> String {
    let certified_key = rcgen::generate_simple_self_signed(vec![subject_alt_name.to_string()]).unwrap();
    certified_key.cert.pem()
}
