// src/common/validation.rs

use validator::ValidationError;

// Normalização aplicada antes de gravar e antes de buscar,
// para que "Ana@X.com " e "ana@x.com" sejam a mesma conta.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// CPF, CNPJ, telefone e CEP são guardados só com dígitos.
pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn digit_count_error(code: &'static str, expected: &str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.add_param("expected".into(), &expected);
    err.message = Some(message.into());
    err
}

/// Aceita pontuação ("123.456.789-01"), mas exige 11 dígitos.
pub fn validate_tax_id(value: &str) -> Result<(), ValidationError> {
    if digits_only(value).len() != 11 {
        return Err(digit_count_error(
            "tax_id",
            "11",
            "O CPF deve conter 11 dígitos.",
        ));
    }
    Ok(())
}

/// DDD + número: 10 dígitos (fixo) ou 11 (celular).
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let len = digits_only(value).len();
    if !(10..=11).contains(&len) {
        return Err(digit_count_error(
            "phone",
            "10-11",
            "O telefone deve conter DDD e número (10 ou 11 dígitos).",
        ));
    }
    Ok(())
}

pub fn validate_registration_number(value: &str) -> Result<(), ValidationError> {
    if digits_only(value).len() != 14 {
        return Err(digit_count_error(
            "registration_number",
            "14",
            "O CNPJ deve conter 14 dígitos.",
        ));
    }
    Ok(())
}

pub fn validate_postal_code(value: &str) -> Result<(), ValidationError> {
    if digits_only(value).len() != 8 {
        return Err(digit_count_error(
            "postal_code",
            "8",
            "O CEP deve conter 8 dígitos.",
        ));
    }
    Ok(())
}

/// Sigla da UF, ex: "SP".
pub fn validate_state(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        let mut err = ValidationError::new("state");
        err.message = Some("Informe a sigla do estado (ex: SP).".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_email_case_and_whitespace() {
        assert_eq!(normalize_email("  Ana@X.com "), "ana@x.com");
    }

    #[test]
    fn strips_punctuation_from_documents() {
        assert_eq!(digits_only("123.456.789-01"), "12345678901");
        assert_eq!(digits_only("(11) 99999-9999"), "11999999999");
    }

    #[test]
    fn tax_id_requires_eleven_digits() {
        assert!(validate_tax_id("12345678901").is_ok());
        assert!(validate_tax_id("123.456.789-01").is_ok());
        assert!(validate_tax_id("1234567890").is_err());
        assert!(validate_tax_id("").is_err());
    }

    #[test]
    fn phone_accepts_landline_and_mobile() {
        assert!(validate_phone("1133334444").is_ok());
        assert!(validate_phone("11999999999").is_ok());
        assert!(validate_phone("999999999").is_err());
    }

    #[test]
    fn registration_number_requires_fourteen_digits() {
        assert!(validate_registration_number("12.345.678/0001-90").is_ok());
        assert!(validate_registration_number("1234567800019").is_err());
    }

    #[test]
    fn state_must_be_two_letters() {
        assert!(validate_state("SP").is_ok());
        assert!(validate_state("sp").is_ok());
        assert!(validate_state("São Paulo").is_err());
        assert!(validate_state("S1").is_err());
    }

    #[test]
    fn postal_code_requires_eight_digits() {
        assert!(validate_postal_code("01310-100").is_ok());
        assert!(validate_postal_code("0131010").is_err());
    }
}
