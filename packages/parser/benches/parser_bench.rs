use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trellis_parser::{parse, serialize};

const FORM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<?import layout.*?>
<?import controls.*?>
<BorderPane x:id="window">
  <top>
    <Label x:id="title" text="Account settings" styleClass="header"/>
  </top>
  <center>
    <GridPane x:id="form" hgap="8" vgap="4">
      <children>
        <Label text="Name" GridPane.rowIndex="0"/>
        <TextField x:id="name" GridPane.columnIndex="1" GridPane.rowIndex="0"/>
        <Label text="Email" GridPane.rowIndex="1"/>
        <TextField x:id="email" GridPane.columnIndex="1" GridPane.rowIndex="1"/>
      </children>
    </GridPane>
  </center>
  <bottom>
    <HBox spacing="4">
      <children>
        <Button x:id="save" text="Save"/>
        <x:copy source="save"/>
      </children>
    </HBox>
  </bottom>
</BorderPane>
"#;

fn parse_form(c: &mut Criterion) {
    c.bench_function("parse_form", |b| b.iter(|| parse(black_box(FORM))));
}

fn parse_wide_container(c: &mut Criterion) {
    let mut source = String::from("<VBox><children>");
    for i in 0..500 {
        source.push_str(&format!(r#"<Label x:id="label{}" text="Row {}"/>"#, i, i));
    }
    source.push_str("</children></VBox>");

    c.bench_function("parse_wide_container", |b| {
        b.iter(|| parse(black_box(&source)))
    });
}

fn serialize_form(c: &mut Criterion) {
    let doc = parse(FORM).expect("bench fixture parses");
    c.bench_function("serialize_form", |b| b.iter(|| serialize(black_box(&doc))));
}

criterion_group!(benches, parse_form, parse_wide_container, serialize_form);
criterion_main!(benches);
