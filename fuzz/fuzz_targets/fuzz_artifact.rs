#![no_main]

use hoard::entity::{ItemData, Package};
use hoard::entity_type;
use hoard::error::Error;
use hoard::reader::EntityReader;
use hoard::stream::ReadStream;
use hoard::validator::EntityValidator;
use hoard::writer::EntityWriter;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Default, Clone, PartialEq)]
struct Probe {
    name: String,
    values: Vec<u32>,
}

impl ItemData for Probe {
    fn write(&self, writer: &mut EntityWriter<'_>) -> Result<(), Error> {
        writer.write("Name", &self.name)?;
        writer.write_slice("Values", &self.values)
    }
    fn read(&mut self, reader: &mut EntityReader<'_, '_>) -> Result<(), Error> {
        self.name = reader.read("Name")?;
        self.values = reader.read_vec("Values")?;
        Ok(())
    }
    fn validate(&self, _validator: &mut EntityValidator) -> Result<(), Error> {
        Ok(())
    }
}

entity_type!(Probe, "Probe");

// arbitrary bytes must never panic the artifact parser, only fail it
fuzz_target!(|data: &[u8]| {
    let mut package = Package::new();
    package.register::<Probe>();

    let mut stream = ReadStream::new(data);
    let mut reader = EntityReader::new(&mut stream);
    let _ = reader.read_section("EntityFile", |section| {
        let entity_type: String = section.read("EntityType")?;
        let record = package
            .find(&entity_type)
            .ok_or_else(|| Error::UnknownEntityType(entity_type))?;
        let mut entity = record.create();
        record.read(entity.as_mut(), section)?;
        Ok(())
    });
});
