#[cfg(test)]
mod tests {
    use tabula_core::{
        AsValue, RESULT_AUTO_INCREMENT, RESULT_ROWS_AFFECTED, Record, Value, last_auto_increment,
        record, rows_affected,
    };
    use uuid::Uuid;

    #[test]
    fn value_null() {
        assert_eq!(Value::Null, Value::Null);
        assert_eq!(Value::Null, Value::Int64(None));
        assert_eq!(Value::Varchar(None), Value::Blob(None));
        assert_ne!(Value::Int64(Some(0)), Value::Null);
        assert!(Value::Uuid(None).is_null());
        assert!(!Value::Boolean(Some(false)).is_null());
    }

    #[test]
    fn value_integers() {
        let val: Value = 42i64.into();
        assert_eq!(val, Value::Int64(Some(42)));
        assert_ne!(val, Value::Int32(Some(42)));
        assert_eq!(i64::try_from_value(Value::Int8(Some(-3))).unwrap(), -3);
        assert_eq!(i32::try_from_value(Value::UInt64(Some(7))).unwrap(), 7);
        assert_eq!(u8::try_from_value(Value::Int64(Some(255))).unwrap(), 255);
        assert!(u8::try_from_value(Value::Int64(Some(256))).is_err());
        assert!(u64::try_from_value(Value::Int32(Some(-1))).is_err());
        assert!(i64::try_from_value(Value::UInt64(Some(u64::MAX))).is_err());
        assert!(i64::try_from_value(Value::Varchar(Some("1".into()))).is_err());
        assert_eq!(Value::UInt64(Some(u64::MAX)).as_i64(), None);
        assert_eq!(Value::UInt16(Some(9)).as_i64(), Some(9));
    }

    #[test]
    fn value_option() {
        let val = None::<String>.as_value();
        assert!(matches!(val, Value::Varchar(None)));
        let val: Option<String> = AsValue::try_from_value(Value::Null).unwrap();
        assert_eq!(val, None);
        let val: Option<bool> = AsValue::try_from_value(Value::Boolean(Some(true))).unwrap();
        assert_eq!(val, Some(true));
    }

    #[test]
    fn value_other() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(Value::from(id), Value::Uuid(Some(id)));
        assert_eq!(Uuid::try_from_value(Value::Uuid(Some(id))).unwrap(), id);
        assert_eq!(Value::from("text"), Value::Varchar(Some("text".into())));
        assert_eq!(
            Value::from(&b"\x01\x02"[..]),
            Value::Blob(Some(vec![1, 2].into_boxed_slice()))
        );
        assert_eq!(
            Vec::<u8>::try_from_value(Value::Blob(Some([7u8].into()))).unwrap(),
            vec![7]
        );
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Int32(None).to_string(), "NULL");
        assert_eq!(Value::Int32(Some(-5)).to_string(), "-5");
        assert_eq!(Value::from("it").to_string(), "'it'");
        assert_eq!(Value::Blob(Some([0xde, 0xad].into())).to_string(), "\\xdead");
    }

    #[test]
    fn record_macro() {
        let record = record! {
            "id" => 1i64,
            "name" => "Ada",
            "nickname" => None::<String>,
        };
        assert_eq!(record.len(), 3);
        assert_eq!(record["id"], Value::Int64(Some(1)));
        assert!(record["nickname"].is_null());
        assert_eq!(record! {}, Record::new());
    }

    #[test]
    fn side_channel() {
        let mut record = Record::new();
        assert_eq!(rows_affected(&record), None);
        record.insert(RESULT_ROWS_AFFECTED.into(), Value::Int64(Some(2)));
        record.insert(RESULT_AUTO_INCREMENT.into(), Value::Int64(Some(10)));
        assert_eq!(rows_affected(&record), Some(2));
        assert_eq!(last_auto_increment(&record), Some(10));
    }
}
