use crate::package::Package;

/// Binary image uploaded together with a package form
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// What the package modal hands over on submit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageForm {
    pub package: Package,
    pub image: Option<ImageAttachment>,
}

impl ImageAttachment {
    /// `type/subtype`, optionally followed by `;` parameters.
    pub fn has_valid_mime_type(&self) -> bool {
        let essence = self.mime_type.split(';').next().unwrap_or_default().trim();
        let token = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
        };
        match essence.split_once('/') {
            Some((kind, subtype)) => token(kind) && token(subtype),
            None => false,
        }
    }
}

impl PackageForm {
    pub fn new(package: Package) -> Self {
        Self { package, image: None }
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Failed to encode field {field}: {source}")]
    Encode {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid image type {mime_type:?} for {file_name}")]
    InvalidImageType { file_name: String, mime_type: String },
}

/// Transport-neutral multipart body for package create/update.
///
/// Scalar fields are kept as ordered text parts; the repository turns them
/// into whatever form encoding its transport needs. Identity is never part
/// of the body: updates carry it in the path, creates have none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackagePayload {
    pub fields: Vec<(&'static str, String)>,
    pub image: Option<ImageAttachment>,
}

impl PackagePayload {
    pub fn from_form(form: &PackageForm) -> Result<Self, PayloadError> {
        if let Some(image) = form.image.as_ref().filter(|i| !i.has_valid_mime_type()) {
            return Err(PayloadError::InvalidImageType {
                file_name: image.file_name.clone(),
                mime_type: image.mime_type.clone(),
            });
        }

        let p = &form.package;
        let mut fields: Vec<(&'static str, String)> = vec![
            ("titulo", p.title.clone()),
            ("descripcion", p.description.clone()),
            ("pais", p.country.clone()),
            ("ciudad", p.city.clone()),
            ("cant_noches", p.nights.to_string()),
            ("activo", p.active.to_string()),
            ("prioridad", p.priority.as_str().to_string()),
            ("moneda", p.currency.clone()),
        ];

        if let Some(code) = &p.iata_city_code {
            fields.push(("ciudad_iata", code.clone()));
        }
        if let Some(from) = p.valid_from {
            fields.push(("fecha_vigencia_desde", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(until) = p.valid_until {
            fields.push(("fecha_vigencia_hasta", until.format("%Y-%m-%d").to_string()));
        }
        if let Some(discount) = &p.discount {
            fields.push(("descuento", discount.clone()));
        }
        if let Some(hotel) = &p.hotel {
            fields.push(("hotel_id", hotel.id.to_string()));
        }
        if let Some(agency) = &p.agency_ref {
            fields.push(("usuario_id", agency.clone()));
        }

        let categories = serde_json::to_string(&p.categories)
            .map_err(|source| PayloadError::Encode { field: "categorias", source })?;
        fields.push(("categorias", categories));

        let gallery = serde_json::to_string(&p.gallery)
            .map_err(|source| PayloadError::Encode { field: "galeria", source })?;
        fields.push(("galeria", gallery));

        // A fresh upload replaces the stored reference
        if form.image.is_none() {
            if let Some(image) = &p.image {
                fields.push(("imagen", image.clone()));
            }
        }

        Ok(Self {
            fields,
            image: form.image.clone(),
        })
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{Hotel, Priority};

    fn form() -> PackageForm {
        PackageForm::new(Package {
            id: Some(42),
            title: "Cataratas".to_string(),
            nights: 3,
            active: true,
            priority: Priority::Low,
            currency: "ARS".to_string(),
            hotel: Some(Hotel { id: 77, name: "Selva".to_string(), stars: None }),
            categories: vec!["naturaleza".to_string()],
            image: Some("paquetes/iguazu.jpg".to_string()),
            agency_ref: Some("7".to_string()),
            ..Package::default()
        })
    }

    #[test]
    fn test_payload_fields() {
        let payload = PackagePayload::from_form(&form()).unwrap();

        assert_eq!(payload.field("id"), None);
        assert_eq!(payload.field("titulo"), Some("Cataratas"));
        assert_eq!(payload.field("cant_noches"), Some("3"));
        assert_eq!(payload.field("prioridad"), Some("baja"));
        assert_eq!(payload.field("hotel_id"), Some("77"));
        assert_eq!(payload.field("categorias"), Some("[\"naturaleza\"]"));
        assert_eq!(payload.field("usuario_id"), Some("7"));
        assert_eq!(payload.field("imagen"), Some("paquetes/iguazu.jpg"));
        assert!(payload.image.is_none());
    }

    #[test]
    fn test_upload_replaces_image_reference() {
        let upload = ImageAttachment {
            file_name: "new.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![0x89, 0x50],
        };
        let payload = PackagePayload::from_form(&form().with_image(upload.clone())).unwrap();

        assert_eq!(payload.field("imagen"), None);
        assert_eq!(payload.image, Some(upload));
    }

    #[test]
    fn test_invalid_image_type_is_rejected() {
        let upload = ImageAttachment {
            file_name: "scan.bin".to_string(),
            mime_type: "not a mime".to_string(),
            bytes: vec![1, 2, 3],
        };
        let result = PackagePayload::from_form(&form().with_image(upload));
        assert!(matches!(result, Err(PayloadError::InvalidImageType { .. })));

        let with_params = ImageAttachment {
            file_name: "a.svg".to_string(),
            mime_type: "image/svg+xml; charset=utf-8".to_string(),
            bytes: vec![],
        };
        assert!(with_params.has_valid_mime_type());
    }
}
